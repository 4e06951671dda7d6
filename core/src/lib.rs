// pushsync-core — Web push subscription manager
//
// Keeps three independently mutable stores in agreement: the browser's
// notification permission, the push manager's subscription, and the
// backend's copy of that subscription.

pub mod api;
pub mod capability;
pub mod codec;
pub mod config;
pub mod permission;
pub mod runtime;
pub mod state;
pub mod sync;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use thiserror::Error;

pub use api::{HttpSubscriptionApi, SessionStore, StaticSession, SubscriptionApi};
pub use capability::NotificationCapability;
pub use codec::{decode_vapid_key, encode_vapid_key};
pub use config::ClientConfig;
pub use permission::PermissionStatus;
pub use runtime::{PushRuntime, PushSubscription, SubscriptionKeys};
pub use state::{ActionOutcome, ActionReport, Notice, NoticeLevel, PushState, UiState};
pub use sync::SubscriptionSynchronizer;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("Push notifications are not supported in this environment")]
    Unsupported,
    #[error("Notification permission was denied")]
    PermissionDenied,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server responded with status {status}")]
    Server { status: u16, body: String },
    #[error("Server rejected the subscription (status {status})")]
    Registration { status: u16, body: String },
    #[error("Malformed VAPID key: {0}")]
    Codec(String),
    #[error("No session token available")]
    Unauthorized,
    #[error("Push runtime error: {0}")]
    Runtime(String),
    #[error("No active push subscription")]
    NotSubscribed,
}

impl PushError {
    /// Transient failures may succeed if the user simply tries again.
    pub fn is_transient(&self) -> bool {
        matches!(self, PushError::Network(_) | PushError::Server { .. })
    }

    /// User-facing wording for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            PushError::Unsupported => "Push notifications are not supported by this browser.",
            PushError::PermissionDenied => {
                "Notifications are blocked. Allow them in your browser settings to continue."
            }
            PushError::Network(_) => "Could not reach the server. Check your connection and try again.",
            PushError::Server { .. } => "The server could not complete the request. Try again later.",
            PushError::Registration { .. } => {
                "The server did not accept this device's subscription. Please try again."
            }
            PushError::Codec(_) => "The server's push key is invalid. Please contact support.",
            PushError::Unauthorized => "Your session has expired. Please sign in again.",
            PushError::Runtime(_) => "The browser could not update the push subscription.",
            PushError::NotSubscribed => "Enable push notifications before sending a test.",
        }
    }
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        PushError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PushError>;
