//! Push runtime abstraction
//!
//! Narrow interface over the browser globals the synchronizer needs
//! (permission API, service worker registration, push manager). The browser
//! binding implements it with `web-sys`; tests use an in-memory fake.

use crate::capability::NotificationCapability;
use crate::permission::PermissionStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Key material the push service issued for a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A push subscription in the shape produced by `PushSubscription.toJSON()`.
///
/// Opaque to this crate beyond existence checks; it is forwarded verbatim to
/// the server on every (re)subscribe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<f64>,
    pub keys: SubscriptionKeys,
}

impl PushSubscription {
    pub fn new(endpoint: impl Into<String>, p256dh: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }
}

/// Browser push capabilities, injected into the synchronizer.
///
/// Futures are not `Send`: everything runs on the page's event loop.
#[async_trait(?Send)]
pub trait PushRuntime {
    /// Feature detection. Pure and synchronous.
    fn probe(&self) -> NotificationCapability;

    /// Current notification permission.
    fn permission(&self) -> PermissionStatus;

    /// Show the permission prompt and wait for the answer.
    async fn request_permission(&self) -> crate::Result<PermissionStatus>;

    /// Subscription currently held by the push manager, if any.
    async fn get_subscription(&self) -> crate::Result<Option<PushSubscription>>;

    /// Create a user-visible subscription for the given application server key.
    async fn subscribe(&self, application_server_key: &[u8]) -> crate::Result<PushSubscription>;

    /// Drop the current subscription. Returns `false` when there was none.
    async fn unsubscribe(&self) -> crate::Result<bool>;
}
