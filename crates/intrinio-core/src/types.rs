use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::{IntrinioError, IntrinioResult, PAGE_SIZE};

/// One entity within a page: item name -> scalar value.
pub type Record = Map<String, Value>;

/// A single scalar handed back to the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// The "not available" marker.
    pub fn na() -> Self {
        CellValue::text("na")
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Turn numeric-looking text into a number; anything else is unchanged.
    pub fn coerce_numeric(self) -> Self {
        match self {
            CellValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => CellValue::Number(n),
                _ => CellValue::Text(s),
            },
            other => other,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<IntrinioError> for CellValue {
    fn from(err: IntrinioError) -> Self {
        CellValue::Text(err.to_string())
    }
}

/// A request against the Intrinio REST API, independent of transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    /// Adds the parameter only when it carries a non-empty value.
    pub fn opt_param(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.param(key, v),
            _ => self,
        }
    }

    pub fn page(self, page_number: u32) -> Self {
        self.param("page_size", PAGE_SIZE.to_string())
            .param("page_number", page_number.to_string())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Decoded response body plus the HTTP status it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub body: Map<String, Value>,
}

impl ApiResponse {
    pub fn new(status_code: u16, body: Map<String, Value>) -> Self {
        Self { status_code, body }
    }

    /// A failed call that carried no usable body.
    pub fn status(status_code: u16) -> Self {
        Self::new(status_code, Map::new())
    }

    /// Build from an arbitrary JSON document; non-object bodies are kept
    /// under `bad_payload`.
    pub fn from_json(status_code: u16, value: Value) -> Self {
        match value {
            Value::Object(body) => Self::new(status_code, body),
            other => {
                let mut body = Map::new();
                body.insert("bad_payload".to_string(), other);
                Self::new(status_code, body)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Interpret the body as one page of a paginated listing.
    ///
    /// A body without `data` is a failed call and maps to its status message.
    pub fn into_page(mut self) -> IntrinioResult<Page> {
        let data = match self.body.remove("data") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(IntrinioError::InvalidResponse(
                    "data is not a list".to_string(),
                ))
            }
            None => return Err(IntrinioError::Status(self.status_code)),
        };
        let data = data
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(IntrinioError::InvalidResponse(format!(
                    "unexpected record {}",
                    other
                ))),
            })
            .collect::<IntrinioResult<Vec<Record>>>()?;

        Ok(Page {
            data,
            total_pages: self.body.get("total_pages").and_then(value_as_u64).map(|n| n as u32),
            result_count: self.body.get("result_count").and_then(value_as_u64),
            status_code: self.status_code,
        })
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One fetched page of a paginated query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub data: Vec<Record>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub result_count: Option<u64>,
    pub status_code: u16,
}

impl Page {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn record(&self, offset: usize) -> Option<&Record> {
        self.data.get(offset)
    }
}
