use dashmap::DashMap;
use intrinio_core::{ApiRequest, IntrinioApi};
use std::sync::Arc;

/// Identifiers that are accepted on sight: FRED series, index symbols and
/// exchange-qualified tickers never go through the verify endpoints.
fn is_self_evident(identifier: &str) -> bool {
    identifier.starts_with("FRED.")
        || identifier == "DMD.ERP"
        || identifier.contains(':')
        || identifier.starts_with('$')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerifyKind {
    Company,
    Security,
    Bank,
}

impl VerifyKind {
    const ALL: [VerifyKind; 3] = [VerifyKind::Company, VerifyKind::Security, VerifyKind::Bank];

    fn request(self, identifier: &str) -> ApiRequest {
        match self {
            VerifyKind::Company => ApiRequest::new("/companies/verify").param("ticker", identifier),
            VerifyKind::Security => ApiRequest::new("/securities/verify").param("ticker", identifier),
            VerifyKind::Bank => ApiRequest::new("/banks/verify").param("identifier", identifier),
        }
    }

    /// Field that echoes the identifier back on success.
    fn echo_field(self) -> &'static str {
        match self {
            VerifyKind::Company | VerifyKind::Security => "ticker",
            VerifyKind::Bank => "identifier",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verification {
    Match,
    NoMatch,
    /// The endpoint could not give an answer (transport failure, auth, throttling).
    Unavailable,
}

/// Memoizing classifier for identifiers.
pub struct IdentifierValidator {
    api: Arc<dyn IntrinioApi>,
    known: DashMap<String, bool>,
}

impl IdentifierValidator {
    pub fn new(api: Arc<dyn IntrinioApi>) -> Self {
        Self {
            api,
            known: DashMap::new(),
        }
    }

    /// Is this identifier believed to be valid?
    ///
    /// Blank input is rejected without being remembered. Otherwise the
    /// uppercased identifier is classified once and the answer kept for the
    /// lifetime of the validator. A negative answer is only remembered when
    /// every verify endpoint actually answered.
    pub async fn is_valid(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return false;
        }
        let id = identifier.to_uppercase();

        if let Some(valid) = self.known.get(&id) {
            return *valid;
        }

        if is_self_evident(&id) {
            self.known.insert(id, true);
            return true;
        }

        let mut conclusive = true;
        for kind in VerifyKind::ALL {
            match self.verify(kind, &id).await {
                Verification::Match => {
                    tracing::debug!("Identifier {} verified as {:?}", id, kind);
                    self.known.insert(id, true);
                    return true;
                }
                Verification::NoMatch => {}
                Verification::Unavailable => conclusive = false,
            }
        }

        if conclusive {
            tracing::debug!("Identifier {} failed all verifications", id);
            self.known.insert(id, false);
        }
        false
    }

    pub fn is_known(&self, identifier: &str) -> bool {
        self.known.contains_key(&identifier.trim().to_uppercase())
    }

    /// Forget a classification so the next lookup verifies again.
    pub fn remove(&self, identifier: &str) {
        self.known.remove(&identifier.trim().to_uppercase());
    }

    async fn verify(&self, kind: VerifyKind, id: &str) -> Verification {
        let response = match self.api.get(&kind.request(id)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{:?} verification of {} failed: {}", kind, id, e);
                return Verification::Unavailable;
            }
        };
        if let Some(echo) = response.get(kind.echo_field()).and_then(|v| v.as_str()) {
            return if echo == id {
                Verification::Match
            } else {
                Verification::NoMatch
            };
        }
        match response.status_code {
            401 | 403 | 429 | 503 => Verification::Unavailable,
            _ => Verification::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_verified_identifier_is_memoized() {
        let api = FakeApi::new();
        api.on("/companies/verify", &[("ticker", "AAPL")], 200, json!({"ticker": "AAPL"}));
        let validator = IdentifierValidator::new(api.clone());

        assert!(validator.is_valid("AAPL").await);
        assert!(validator.is_valid("aapl").await);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_prefix_rules_skip_remote_calls() {
        let api = FakeApi::new();
        let validator = IdentifierValidator::new(api.clone());

        assert!(validator.is_valid("FRED.GDP").await);
        assert!(validator.is_valid("dmd.erp").await);
        assert!(validator.is_valid("AAPL:US").await);
        assert!(validator.is_valid("$SPX").await);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_through_to_bank() {
        let api = FakeApi::new();
        api.on("/banks/verify", &[("identifier", "BANK1")], 200, json!({"identifier": "BANK1"}));
        let validator = IdentifierValidator::new(api.clone());

        assert!(validator.is_valid("bank1").await);
        assert_eq!(api.calls_to("/companies/verify"), 1);
        assert_eq!(api.calls_to("/securities/verify"), 1);
        assert_eq!(api.calls_to("/banks/verify"), 1);
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_memoized_invalid() {
        let api = FakeApi::new();
        let validator = IdentifierValidator::new(api.clone());

        assert!(!validator.is_valid("NOPE").await);
        assert!(!validator.is_valid("NOPE").await);
        assert_eq!(api.calls(), 3);
        assert!(validator.is_known("nope"));

        validator.remove("NOPE");
        assert!(!validator.is_known("NOPE"));
    }

    #[tokio::test]
    async fn test_blank_identifier_is_not_memoized() {
        let api = FakeApi::new();
        let validator = IdentifierValidator::new(api.clone());

        assert!(!validator.is_valid("").await);
        assert!(!validator.is_valid("   ").await);
        assert_eq!(api.calls(), 0);
        assert!(!validator.is_known(""));
    }

    #[tokio::test]
    async fn test_throttled_verification_is_not_memoized() {
        let api = FakeApi::new();
        api.on("/companies/verify", &[], 503, json!({}));
        let validator = IdentifierValidator::new(api.clone());

        assert!(!validator.is_valid("MSFT").await);
        assert!(!validator.is_known("MSFT"));

        api.on("/companies/verify", &[("ticker", "MSFT")], 200, json!({"ticker": "MSFT"}));
        assert!(validator.is_valid("MSFT").await);
    }
}
