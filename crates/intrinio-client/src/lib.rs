use async_trait::async_trait;
use intrinio_core::{ApiRequest, ApiResponse, IntrinioApi, IntrinioError, IntrinioResult};
use reqwest::{Certificate, Client};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod config;

pub use config::{ConfigStore, Credentials, DEFAULT_BASE_URL};

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            let oldest = match ts.front() {
                Some(&oldest) if ts.len() >= self.max_requests => oldest,
                _ => {
                    ts.push_back(now);
                    return;
                }
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).saturating_duration_since(now)
                + Duration::from_millis(10);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.2}s for Intrinio API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// HTTPS transport to the Intrinio API using basic authentication.
#[derive(Clone)]
pub struct IntrinioClient {
    config: Arc<ConfigStore>,
    client: Client,
    rate_limiter: RateLimiter,
}

impl IntrinioClient {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        // Intrinio throttles per second (503 when exceeded).
        let rate_limit: usize = std::env::var("INTRINIO_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if let Some(path) = config.credentials().cacerts {
            match std::fs::read(&path).map(|pem| Certificate::from_pem(&pem)) {
                Ok(Ok(cert)) => builder = builder.add_root_certificate(cert),
                Ok(Err(e)) => tracing::warn!("Ignoring CA bundle {}: {}", path, e),
                Err(e) => tracing::warn!("Unable to read CA bundle {}: {}", path, e),
            }
        }
        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self {
            config,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(1)),
        }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }
}

#[async_trait]
impl IntrinioApi for IntrinioClient {
    async fn get(&self, request: &ApiRequest) -> IntrinioResult<ApiResponse> {
        let credentials = self.config.credentials();
        let url = format!("{}{}", self.config.base_url().trim_end_matches('/'), request.path);

        self.rate_limiter.acquire().await;
        tracing::debug!("Calling Intrinio: {} {:?}", url, request.params);

        let response = self
            .client
            .get(&url)
            .query(&request.params)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await
            .map_err(|e| IntrinioError::Transport(e.to_string()))?;

        let status_code = response.status().as_u16();
        tracing::debug!("Status code: {}", status_code);
        if !response.status().is_success() {
            tracing::warn!("Intrinio {} returned HTTP {}", request.path, status_code);
            return Ok(ApiResponse::status(status_code));
        }

        let text = response
            .text()
            .await
            .map_err(|e| IntrinioError::Transport(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(ApiResponse::status(status_code));
        }

        match serde_json::from_str(&text) {
            Ok(json) => Ok(ApiResponse::from_json(status_code, json)),
            Err(e) => {
                tracing::error!("Intrinio {} returned invalid JSON: {}", request.path, e);
                Ok(ApiResponse::from_json(
                    status_code,
                    serde_json::Value::String(text),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> IntrinioClient {
        let store = ConfigStore::in_memory(Credentials::new("user", "pass"))
            .with_base_url(server.base_url());
        IntrinioClient::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_sends_basic_auth_and_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/prices")
                    .query_param("identifier", "AAPL")
                    .query_param("page_size", "100")
                    .query_param("page_number", "1")
                    // base64("user:pass")
                    .header("authorization", "Basic dXNlcjpwYXNz");
                then.status(200)
                    .json_body(json!({"data": [{"close": 170.5}], "total_pages": 1}));
            })
            .await;

        let client = client_for(&server);
        let request = ApiRequest::new("/prices").param("identifier", "AAPL").page(1);
        let response = client.get(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status_code, 200);
        let page = response.into_page().unwrap();
        assert_eq!(page.data[0]["close"], json!(170.5));
    }

    #[tokio::test]
    async fn test_error_status_has_empty_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/news");
                then.status(429).body("slow down");
            })
            .await;

        let client = client_for(&server);
        let response = client.get(&ApiRequest::new("/news")).await.unwrap();
        assert_eq!(response.status_code, 429);
        assert!(response.body.is_empty());
        assert_eq!(
            response.into_page().unwrap_err().to_string(),
            "Plan limit reached"
        );
    }

    #[tokio::test]
    async fn test_invalid_json_is_kept_as_bad_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/usage/current");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let client = client_for(&server);
        let response = client.get(&ApiRequest::new("/usage/current")).await.unwrap();
        assert_eq!(response.get("bad_payload"), Some(&json!("<html>maintenance</html>")));
    }

    #[tokio::test]
    async fn test_rate_limiter_admits_up_to_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_millis(100), limiter.acquire())
                .await
                .unwrap();
        }
        let blocked = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(blocked.is_err());
    }
}
