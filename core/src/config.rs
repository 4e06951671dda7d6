// Client configuration shared by the browser binding and the CLI.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the backend. Empty means same origin in the browser.
    pub api_base_url: String,

    /// Session storage key holding the bearer token
    pub session_token_key: String,

    /// Upper bound for a single HTTP request (native clients only)
    pub request_timeout_secs: u64,

    /// Re-register an existing subscription with the server on reconcile
    pub resync_on_reconcile: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            session_token_key: "token".to_string(),
            request_timeout_secs: 30,
            resync_on_reconcile: false,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL for an API path, tolerating a trailing slash on the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.session_token_key, "token");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.resync_on_reconcile);
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = ClientConfig::with_base_url("https://quiz.example.com/");
        assert_eq!(
            config.endpoint("/api/notifications/test"),
            "https://quiz.example.com/api/notifications/test"
        );
        assert_eq!(ClientConfig::default().endpoint("/api/x"), "/api/x");
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"apiBaseUrl":"http://localhost:3000"}"#).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:3000");
        assert_eq!(config.session_token_key, "token");
    }
}
