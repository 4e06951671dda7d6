// Browser implementation of the push runtime
//
// Wraps the Notifications API, the service worker registration and its push
// manager. Every promise is awaited through `JsFuture`; rejections become
// `PushError::Runtime` with the JS error text attached.

use async_trait::async_trait;
use js_sys::{Reflect, Uint8Array, JSON};
use pushsync_core::{
    NotificationCapability, PermissionStatus, PushError, PushRuntime, PushSubscription,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{NotificationPermission, PushManager, PushSubscriptionOptionsInit, ServiceWorkerRegistration};

fn js_error(operation: &str, err: JsValue) -> PushError {
    let detail = err.as_string().unwrap_or_else(|| format!("{:?}", err));
    PushError::Runtime(format!("{operation} failed: {detail}"))
}

fn has_property(target: &JsValue, name: &str) -> bool {
    Reflect::has(target, &JsValue::from_str(name)).unwrap_or(false)
}

/// Push runtime backed by the page's `window`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserRuntime;

impl BrowserRuntime {
    pub fn new() -> Self {
        Self
    }

    /// Push manager of the active service worker registration.
    ///
    /// Waits on `navigator.serviceWorker.ready`, which only settles once a
    /// worker for this scope is active.
    async fn push_manager(&self) -> pushsync_core::Result<PushManager> {
        let window = web_sys::window().ok_or(PushError::Unsupported)?;
        let ready = window
            .navigator()
            .service_worker()
            .ready()
            .map_err(|e| js_error("serviceWorker.ready", e))?;
        let registration: ServiceWorkerRegistration = JsFuture::from(ready)
            .await
            .map_err(|e| js_error("serviceWorker.ready", e))?
            .dyn_into()
            .map_err(|_| PushError::Runtime("serviceWorker.ready returned no registration".into()))?;

        registration
            .push_manager()
            .map_err(|e| js_error("registration.pushManager", e))
    }

    async fn current(&self) -> pushsync_core::Result<Option<web_sys::PushSubscription>> {
        let manager = self.push_manager().await?;
        let promise = manager
            .get_subscription()
            .map_err(|e| js_error("pushManager.getSubscription", e))?;
        let value = JsFuture::from(promise)
            .await
            .map_err(|e| js_error("pushManager.getSubscription", e))?;

        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        value
            .dyn_into::<web_sys::PushSubscription>()
            .map(Some)
            .map_err(|_| PushError::Runtime("getSubscription returned an unexpected value".into()))
    }
}

/// Serialize a browser subscription through its `toJSON()` form.
fn to_subscription(subscription: &web_sys::PushSubscription) -> pushsync_core::Result<PushSubscription> {
    let json: String = JSON::stringify(subscription)
        .map_err(|e| js_error("JSON.stringify(subscription)", e))?
        .into();
    serde_json::from_str(&json)
        .map_err(|e| PushError::Runtime(format!("unexpected subscription shape: {e}")))
}

#[async_trait(?Send)]
impl PushRuntime for BrowserRuntime {
    fn probe(&self) -> NotificationCapability {
        let Some(window) = web_sys::window() else {
            return NotificationCapability::none();
        };
        let navigator: JsValue = window.navigator().into();
        let window: JsValue = window.into();

        NotificationCapability {
            supports_permission_api: has_property(&window, "Notification"),
            supports_service_worker: has_property(&navigator, "serviceWorker"),
            supports_push_manager: has_property(&window, "PushManager"),
        }
    }

    fn permission(&self) -> PermissionStatus {
        match web_sys::Notification::permission() {
            NotificationPermission::Granted => PermissionStatus::Granted,
            NotificationPermission::Denied => PermissionStatus::Denied,
            _ => PermissionStatus::Default,
        }
    }

    async fn request_permission(&self) -> pushsync_core::Result<PermissionStatus> {
        let promise = web_sys::Notification::request_permission()
            .map_err(|e| js_error("Notification.requestPermission", e))?;
        let answer = JsFuture::from(promise)
            .await
            .map_err(|e| js_error("Notification.requestPermission", e))?;

        Ok(match answer.as_string() {
            Some(value) => PermissionStatus::from_browser(&value),
            None => self.permission(),
        })
    }

    async fn get_subscription(&self) -> pushsync_core::Result<Option<PushSubscription>> {
        match self.current().await? {
            Some(subscription) => to_subscription(&subscription).map(Some),
            None => Ok(None),
        }
    }

    async fn subscribe(&self, application_server_key: &[u8]) -> pushsync_core::Result<PushSubscription> {
        let manager = self.push_manager().await?;

        let key: JsValue = Uint8Array::from(application_server_key).into();
        let options = PushSubscriptionOptionsInit::new();
        options.set_user_visible_only(true);
        options.set_application_server_key(&key);

        let promise = manager
            .subscribe_with_options(&options)
            .map_err(|e| js_error("pushManager.subscribe", e))?;
        let subscription: web_sys::PushSubscription = JsFuture::from(promise)
            .await
            .map_err(|e| js_error("pushManager.subscribe", e))?
            .dyn_into()
            .map_err(|_| PushError::Runtime("pushManager.subscribe returned an unexpected value".into()))?;

        tracing::debug!("push manager issued a subscription");
        to_subscription(&subscription)
    }

    async fn unsubscribe(&self) -> pushsync_core::Result<bool> {
        let Some(subscription) = self.current().await? else {
            return Ok(false);
        };
        let promise = subscription
            .unsubscribe()
            .map_err(|e| js_error("subscription.unsubscribe", e))?;
        let removed = JsFuture::from(promise)
            .await
            .map_err(|e| js_error("subscription.unsubscribe", e))?;
        Ok(removed.as_bool().unwrap_or(false))
    }
}
