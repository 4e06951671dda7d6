// pushsync-wasm — WebAssembly bindings for the browser

pub mod runtime;
pub mod session;

use crate::runtime::BrowserRuntime;
use crate::session::LocalStorageSession;
use pushsync_core::{
    ActionOutcome, ActionReport, ClientConfig, HttpSubscriptionApi, Notice,
    SubscriptionSynchronizer, UiState,
};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

type Synchronizer = SubscriptionSynchronizer<BrowserRuntime, HttpSubscriptionApi<LocalStorageSession>>;

#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// Decode a base64url VAPID key into the bytes `pushManager.subscribe` expects.
#[wasm_bindgen(js_name = decodeVapidKey)]
pub fn decode_vapid_key(key: &str) -> Result<Vec<u8>, JsValue> {
    pushsync_core::decode_vapid_key(key).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Push notification controller for the settings page.
///
/// Create one per page load and call `reconcile()` on mount. `activate()`
/// may show the permission prompt, so call it only from a click handler.
/// Every method resolves; failures are reported in the returned object,
/// never thrown.
#[wasm_bindgen]
pub struct PushNotifications {
    inner: Rc<Synchronizer>,
}

#[wasm_bindgen]
impl PushNotifications {
    /// `config` is an optional `{ apiBaseUrl, sessionTokenKey, resyncOnReconcile }` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PushNotifications, JsValue> {
        let mut config: ClientConfig = if config.is_undefined() || config.is_null() {
            ClientConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };

        // reqwest needs an absolute URL; empty means this page's origin
        if config.api_base_url.is_empty() {
            if let Some(window) = web_sys::window() {
                config.api_base_url = window.location().origin()?;
            }
        }

        let session = LocalStorageSession::new(config.session_token_key.clone());
        let resync = config.resync_on_reconcile;
        let api = HttpSubscriptionApi::new(config, session)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(Self {
            inner: Rc::new(SubscriptionSynchronizer::new(BrowserRuntime::new(), api).resync_on_reconcile(resync)),
        })
    }

    /// Rebuild the state from the browser. Resolves to the `UiState`.
    pub fn reconcile(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        wasm_bindgen_futures::future_to_promise(async move {
            let ui = inner.reconcile().await;
            Ok(to_js(&ui))
        })
    }

    /// Enable push. Resolves to an action report.
    pub fn activate(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        wasm_bindgen_futures::future_to_promise(async move {
            let report = inner.activate().await;
            Ok(to_js(&WasmActionReport::from(report)))
        })
    }

    /// Disable push on this device. Resolves to an action report.
    pub fn deactivate(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        wasm_bindgen_futures::future_to_promise(async move {
            let report = inner.deactivate().await;
            Ok(to_js(&WasmActionReport::from(report)))
        })
    }

    #[wasm_bindgen(js_name = sendTest)]
    pub fn send_test(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        wasm_bindgen_futures::future_to_promise(async move {
            let report = inner.send_test().await;
            Ok(to_js(&WasmActionReport::from(report)))
        })
    }

    #[wasm_bindgen(js_name = uiState)]
    pub fn ui_state(&self) -> JsValue {
        to_js(&self.inner.ui_state())
    }

    #[wasm_bindgen(js_name = statusMessage)]
    pub fn status_message(&self) -> String {
        self.inner.status_message().to_string()
    }

    #[wasm_bindgen(js_name = canActivate)]
    pub fn can_activate(&self) -> bool {
        self.inner.state().can_activate()
    }

    /// Notice from the last action or reconcile, or `undefined`.
    #[wasm_bindgen(js_name = lastNotice)]
    pub fn last_notice(&self) -> JsValue {
        to_js(&self.inner.last_notice())
    }

    #[wasm_bindgen(js_name = clearNotice)]
    pub fn clear_notice(&self) {
        self.inner.clear_notice();
    }
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        tracing::warn!("could not convert value for JS: {}", e);
        JsValue::NULL
    })
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct WasmActionReport {
    /// "completed" | "skipped" | "degraded" | "failed"
    outcome: &'static str,
    error: Option<String>,
    transient: bool,
    ui: UiState,
    notice: Option<Notice>,
}

impl From<ActionReport> for WasmActionReport {
    fn from(report: ActionReport) -> Self {
        let outcome = match &report.outcome {
            ActionOutcome::Completed => "completed",
            ActionOutcome::Skipped => "skipped",
            ActionOutcome::Degraded(_) => "degraded",
            ActionOutcome::Failed(_) => "failed",
        };
        let error = report.outcome.error();
        Self {
            outcome,
            error: error.map(|e| e.to_string()),
            transient: error.map(|e| e.is_transient()).unwrap_or(false),
            ui: report.ui,
            notice: report.notice,
        }
    }
}
