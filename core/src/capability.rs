//! Runtime feature detection for web push.
//!
//! The probe result is computed once per session. Missing features are an
//! expected outcome, never an error.

use serde::{Deserialize, Serialize};

/// Which of the browser APIs required for push are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCapability {
    /// `Notification` permission API is exposed
    pub supports_permission_api: bool,
    /// `navigator.serviceWorker` is exposed
    pub supports_service_worker: bool,
    /// `PushManager` is exposed
    pub supports_push_manager: bool,
}

impl NotificationCapability {
    /// Capabilities of a runtime with full push support.
    pub fn full() -> Self {
        Self {
            supports_permission_api: true,
            supports_service_worker: true,
            supports_push_manager: true,
        }
    }

    /// Capabilities of a runtime with none of the push APIs.
    pub fn none() -> Self {
        Self::default()
    }

    /// Push works only when every API is available.
    pub fn is_supported(&self) -> bool {
        self.supports_permission_api && self.supports_service_worker && self.supports_push_manager
    }

    /// Names of the missing APIs, for diagnostics.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.supports_permission_api {
            missing.push("Notification");
        }
        if !self.supports_service_worker {
            missing.push("serviceWorker");
        }
        if !self.supports_push_manager {
            missing.push("PushManager");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_capability_is_supported() {
        assert!(NotificationCapability::full().is_supported());
        assert!(NotificationCapability::full().missing().is_empty());
    }

    #[test]
    fn test_any_missing_api_is_unsupported() {
        let cap = NotificationCapability {
            supports_push_manager: false,
            ..NotificationCapability::full()
        };
        assert!(!cap.is_supported());
        assert_eq!(cap.missing(), vec!["PushManager"]);
        assert!(!NotificationCapability::none().is_supported());
    }
}
