//! Server bridge — request/response client for the backend subscription endpoints.
//!
//! Stateless apart from the HTTP client. Authorized calls read the bearer
//! token from a [`SessionStore`] on every request and fail with
//! [`PushError::Unauthorized`] before touching the network when there is none.

use crate::config::ClientConfig;
use crate::runtime::PushSubscription;
use crate::PushError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const VAPID_KEY_PATH: &str = "/api/notifications/vapid-key";
pub const SUBSCRIBE_PATH: &str = "/api/notifications/subscribe";
pub const UNSUBSCRIBE_PATH: &str = "/api/notifications/unsubscribe";
pub const TEST_PATH: &str = "/api/notifications/test";

/// Source of the session's bearer token.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, for the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(Option<String>);

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl SessionStore for StaticSession {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.is_empty())
    }
}

/// Backend operations the synchronizer depends on.
#[async_trait(?Send)]
pub trait SubscriptionApi {
    /// Public application server key for this deployment (base64url).
    async fn fetch_vapid_public_key(&self) -> crate::Result<String>;

    /// Store the full subscription for the current user. Replaces any previous record.
    async fn register_subscription(&self, subscription: &PushSubscription) -> crate::Result<()>;

    /// Forget the current user's subscription. The server resolves it from the session.
    async fn deregister_subscription(&self) -> crate::Result<()>;

    /// Ask the server to push a diagnostic notification back to this client.
    async fn send_test_notification(&self) -> crate::Result<()>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VapidKeyResponse {
    public_key: String,
}

#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    subscription: &'a PushSubscription,
}

/// [`SubscriptionApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSubscriptionApi<S> {
    client: reqwest::Client,
    config: ClientConfig,
    session: S,
}

impl<S: SessionStore> HttpSubscriptionApi<S> {
    /// Build a client for `config`.
    ///
    /// On native targets every request is bounded by
    /// `config.request_timeout_secs`; the browser's fetch has no client-side bound.
    pub fn new(config: ClientConfig, session: S) -> crate::Result<Self> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(config.request_timeout());
        let client = builder.build()?;

        Ok(Self::with_client(client, config, session))
    }

    /// Use a pre-configured HTTP client.
    pub fn with_client(client: reqwest::Client, config: ClientConfig, session: S) -> Self {
        Self {
            client,
            config,
            session,
        }
    }

    fn token(&self) -> crate::Result<String> {
        self.session.bearer_token().ok_or(PushError::Unauthorized)
    }

    async fn post_authorized(&self, path: &str) -> crate::Result<reqwest::Response> {
        let token = self.token()?;
        let response = self
            .client
            .post(self.config.endpoint(path))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(response)
    }
}

/// Status and body of a non-2xx response.
async fn failure_parts(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

async fn expect_success(path: &str, response: reqwest::Response) -> crate::Result<()> {
    if response.status().is_success() {
        return Ok(());
    }
    let (status, body) = failure_parts(response).await;
    tracing::warn!("{} failed with status {}", path, status);
    Err(PushError::Server { status, body })
}

#[async_trait(?Send)]
impl<S: SessionStore> SubscriptionApi for HttpSubscriptionApi<S> {
    async fn fetch_vapid_public_key(&self) -> crate::Result<String> {
        let response = self
            .client
            .get(self.config.endpoint(VAPID_KEY_PATH))
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            tracing::warn!("{} failed with status {}", VAPID_KEY_PATH, status);
            return Err(PushError::Server { status, body });
        }

        let text = response.text().await?;
        let parsed: VapidKeyResponse =
            serde_json::from_str(&text).map_err(|e| PushError::Server {
                status,
                body: format!("invalid VAPID key response: {e}"),
            })?;
        tracing::debug!("fetched VAPID key ({} chars)", parsed.public_key.len());
        Ok(parsed.public_key)
    }

    async fn register_subscription(&self, subscription: &PushSubscription) -> crate::Result<()> {
        let token = self.token()?;
        let response = self
            .client
            .post(self.config.endpoint(SUBSCRIBE_PATH))
            .bearer_auth(token)
            .json(&SubscribeRequest { subscription })
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            tracing::warn!("server rejected subscription with status {}", status);
            return Err(PushError::Registration { status, body });
        }

        tracing::info!("subscription registered with server");
        Ok(())
    }

    async fn deregister_subscription(&self) -> crate::Result<()> {
        let response = self.post_authorized(UNSUBSCRIBE_PATH).await?;
        expect_success(UNSUBSCRIBE_PATH, response).await?;
        tracing::info!("subscription removed from server");
        Ok(())
    }

    async fn send_test_notification(&self) -> crate::Result<()> {
        let response = self.post_authorized(TEST_PATH).await?;
        expect_success(TEST_PATH, response).await
    }
}
