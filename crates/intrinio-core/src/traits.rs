use async_trait::async_trait;

use crate::{ApiRequest, ApiResponse, IntrinioResult};

/// Transport to the Intrinio REST API.
///
/// `Err` means no HTTP response was obtained at all. A non-2xx response is
/// still `Ok`, carrying its status code.
#[async_trait]
pub trait IntrinioApi: Send + Sync {
    async fn get(&self, request: &ApiRequest) -> IntrinioResult<ApiResponse>;
}

/// Result of asking the user for credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted { username: String, password: String },
    Declined { do_not_ask_again: bool },
}

/// Interactive credential acquisition (a dialog in the host application).
pub trait CredentialPrompt: Send + Sync {
    fn prompt(&self) -> LoginOutcome;
}

/// Where credentials live between sessions.
pub trait CredentialStore: Send + Sync {
    fn is_configured(&self) -> bool;

    fn save(&self, username: &str, password: &str) -> IntrinioResult<()>;
}
