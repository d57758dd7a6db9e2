use chrono::{Days, NaiveDate};

use crate::{IntrinioError, IntrinioResult};

/// A date as a spreadsheet hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    /// Days since 1899-12-30; the fractional part is the time of day.
    Serial(f64),
    Text(String),
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Text(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        DateInput::Text(value)
    }
}

impl From<f64> for DateInput {
    fn from(value: f64) -> Self {
        DateInput::Serial(value)
    }
}

/// Normalize an optional date into ISO `YYYY-MM-DD`.
///
/// Absent input, blank text and a zero serial (an empty cell) all normalize
/// to `None`. Accepted text forms are ISO, `m/d/yy`, `m/d/yyyy` and a bare
/// serial number.
pub fn normalize_date(input: Option<&DateInput>) -> IntrinioResult<Option<String>> {
    let date = match input {
        None => return Ok(None),
        Some(DateInput::Serial(serial)) => {
            if *serial == 0.0 {
                return Ok(None);
            }
            serial_to_date(*serial)
                .ok_or_else(|| IntrinioError::DateFormat(serial.to_string()))?
        }
        Some(DateInput::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            parse_text_date(text).ok_or_else(|| IntrinioError::DateFormat(text.to_string()))?
        }
    };
    Ok(Some(date.format("%Y-%m-%d").to_string()))
}

/// Convert a spreadsheet serial date (1899-12-30 = 0) into a calendar date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(Days::new(serial.trunc() as u64))
}

fn parse_text_date(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if text.contains('/') {
        return parse_us_date(text);
    }
    text.parse::<f64>().ok().and_then(serial_to_date)
}

fn parse_us_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split('/').map(str::trim).collect();
    let [month, day, year] = parts.as_slice() else {
        return None;
    };
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let year_value: i32 = year.parse().ok()?;
    // Two-digit years pivot at 69, same as strptime's %y.
    let year = match year.len() {
        1 | 2 if year_value < 69 => 2000 + year_value,
        1 | 2 => 1900 + year_value,
        4 => year_value,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}
