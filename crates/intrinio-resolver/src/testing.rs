//! In-memory stand-in for the Intrinio API used by the unit tests.

use async_trait::async_trait;
use intrinio_core::{ApiRequest, ApiResponse, IntrinioApi, IntrinioResult};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

struct Route {
    path: String,
    params: Vec<(String, String)>,
    response: ApiResponse,
}

/// Answers requests from registered routes and records every call.
/// Unmatched requests get a 404.
#[derive(Default)]
pub(crate) struct FakeApi {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a response for `path` when every listed param matches.
    /// Later registrations win over earlier ones.
    pub(crate) fn on(&self, path: &str, params: &[(&str, &str)], status: u16, body: Value) {
        self.routes.lock().unwrap().push(Route {
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            response: ApiResponse::from_json(status, body),
        });
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntrinioApi for FakeApi {
    async fn get(&self, request: &ApiRequest) -> IntrinioResult<ApiResponse> {
        self.calls.lock().unwrap().push(request.clone());
        let routes = self.routes.lock().unwrap();
        let matched = routes.iter().rev().find(|route| {
            route.path == request.path
                && route
                    .params
                    .iter()
                    .all(|(k, v)| request.query_value(k) == Some(v.as_str()))
        });
        Ok(matched
            .map(|route| route.response.clone())
            .unwrap_or_else(|| ApiResponse::status(404)))
    }
}

/// Body of one page of a paginated listing.
pub(crate) fn page_body(records: Vec<Value>, total_pages: u32) -> Value {
    let result_count = records.len();
    json!({
        "data": records,
        "total_pages": total_pages,
        "result_count": result_count,
    })
}
