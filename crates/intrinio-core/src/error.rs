use thiserror::Error;

/// Everything that can go wrong between a cell call and an Intrinio response.
///
/// None of these cross the function boundary as errors: each one is rendered
/// into the cell as its display string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntrinioError {
    #[error("{}", status_code_message(*.0))]
    Status(u16),

    #[error("Invalid date format: {0}")]
    DateFormat(String),

    #[error("No configuration")]
    NotConfigured,

    #[error("Invalid identifier")]
    InvalidIdentifier,

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type IntrinioResult<T> = Result<T, IntrinioError>;

/// Fixed message for a non-success HTTP status.
pub fn status_code_message(status_code: u16) -> String {
    match status_code {
        429 => "Plan limit reached".to_string(),
        401 => "Your username and password keys are incorrect".to_string(),
        403 => "Visit Intrinio.com to subscribe".to_string(),
        503 => "You have reached your throttle limit regarding requests/second".to_string(),
        other => format!("Unexpected status code {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_messages() {
        assert_eq!(status_code_message(429), "Plan limit reached");
        assert_eq!(
            status_code_message(401),
            "Your username and password keys are incorrect"
        );
        assert_eq!(status_code_message(403), "Visit Intrinio.com to subscribe");
        assert_eq!(
            status_code_message(503),
            "You have reached your throttle limit regarding requests/second"
        );
        assert_eq!(status_code_message(999), "Unexpected status code 999");
    }

    #[test]
    fn test_status_error_displays_message() {
        assert_eq!(IntrinioError::Status(429).to_string(), "Plan limit reached");
        assert_eq!(IntrinioError::NotConfigured.to_string(), "No configuration");
        assert_eq!(
            IntrinioError::DateFormat("13/45/17".into()).to_string(),
            "Invalid date format: 13/45/17"
        );
    }
}
