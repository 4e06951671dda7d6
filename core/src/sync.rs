//! Subscription synchronizer
//!
//! Owns the composite [`PushState`] and drives every transition:
//!
//! - `reconcile` rebuilds the state from the browser on mount. It never
//!   prompts and never creates a subscription.
//! - `activate` asks for permission when needed and runs the subscribe flow
//!   (reuse or create the push-manager subscription, then register it with
//!   the server). `GrantedSubscribed` is committed only after the server
//!   accepted the subscription; on rejection the local subscription is rolled
//!   back so the browser never holds one the server does not know about.
//! - `deactivate` unsubscribes locally first, then tells the server on a
//!   best-effort basis.
//! - `send_test` asks the server for a diagnostic push.
//!
//! Actions are serialized by a busy flag. A second action while one is in
//! flight is reported as skipped and touches neither the browser nor the
//! server. The flag lives in a guard so it is released on every exit path.

use crate::api::SubscriptionApi;
use crate::capability::NotificationCapability;
use crate::codec;
use crate::permission::{self, PermissionStatus};
use crate::runtime::PushRuntime;
use crate::state::{ActionOutcome, ActionReport, Notice, NoticeLevel, PushState, UiState};
use crate::PushError;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct SyncInner {
    state: PushState,
    /// Probed once per session
    capability: Option<NotificationCapability>,
    busy: bool,
    /// Bumped whenever an action or reconcile starts; stale reconciles are dropped
    epoch: u64,
    notice: Option<Notice>,
    /// Endpoint the server rejected this session and that could not be rolled back
    rejected_endpoint: Option<String>,
}

/// Releases the busy flag when dropped.
struct BusyGuard<'a> {
    inner: &'a Mutex<SyncInner>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock().busy = false;
    }
}

/// What a completed action wants to report.
struct Done {
    outcome: ActionOutcome,
    notice: Option<Notice>,
}

impl Done {
    fn completed(notice: Notice) -> Self {
        Self {
            outcome: ActionOutcome::Completed,
            notice: Some(notice),
        }
    }

    fn skipped(notice: Option<Notice>) -> Self {
        Self {
            outcome: ActionOutcome::Skipped,
            notice,
        }
    }
}

pub struct SubscriptionSynchronizer<R, A> {
    runtime: R,
    api: A,
    resync_on_reconcile: bool,
    inner: Mutex<SyncInner>,
}

impl<R: PushRuntime, A: SubscriptionApi> SubscriptionSynchronizer<R, A> {
    /// Create a synchronizer. State starts as all-false until the first `reconcile`.
    pub fn new(runtime: R, api: A) -> Self {
        Self {
            runtime,
            api,
            resync_on_reconcile: false,
            inner: Mutex::new(SyncInner::default()),
        }
    }

    /// Re-register an already existing subscription with the server during
    /// `reconcile`, so `subscribed` is only reported after a registration that
    /// succeeded in this session.
    pub fn resync_on_reconcile(mut self, enabled: bool) -> Self {
        self.resync_on_reconcile = enabled;
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn capability(&self) -> NotificationCapability {
        let mut inner = self.inner.lock();
        *inner.capability.get_or_insert_with(|| self.runtime.probe())
    }

    pub fn state(&self) -> PushState {
        self.inner.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.inner.lock().busy
    }

    pub fn ui_state(&self) -> UiState {
        let inner = self.inner.lock();
        inner.state.ui(inner.busy)
    }

    pub fn status_message(&self) -> &'static str {
        self.state().status_message()
    }

    /// Notice produced by the most recent action or reconcile.
    pub fn last_notice(&self) -> Option<Notice> {
        self.inner.lock().notice.clone()
    }

    pub fn clear_notice(&self) {
        self.inner.lock().notice = None;
    }

    // ------------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------------

    /// Rebuild the state from capability, permission and the push manager.
    ///
    /// Skipped while an action is in flight; a result overtaken by an action
    /// that started meanwhile is discarded.
    pub async fn reconcile(&self) -> UiState {
        let epoch = {
            let mut inner = self.inner.lock();
            if inner.busy {
                tracing::debug!("reconcile skipped: action in flight");
                return inner.state.ui(true);
            }
            inner.epoch += 1;
            inner.epoch
        };

        let (observed, notice) = self.observe().await;

        let mut inner = self.inner.lock();
        if inner.epoch != epoch || inner.busy {
            tracing::debug!("discarding stale reconcile result {}", observed);
            return inner.state.ui(inner.busy);
        }
        if inner.state != observed {
            tracing::debug!("reconciled {} -> {}", inner.state, observed);
        }
        inner.state = observed;
        if notice.is_some() {
            inner.notice = notice;
        }
        observed.ui(false)
    }

    async fn observe(&self) -> (PushState, Option<Notice>) {
        let capability = self.capability();
        if !capability.is_supported() {
            tracing::info!("push unsupported, missing: {:?}", capability.missing());
            return (PushState::Unsupported, None);
        }

        let status = permission::read_status(&self.runtime);
        if !status.is_granted() {
            return (PushState::from_parts(capability, status, false), None);
        }

        let existing = match self.runtime.get_subscription().await {
            Ok(existing) => existing,
            Err(err) => {
                tracing::warn!("could not read push subscription: {}", err);
                None
            }
        };

        match existing {
            None => (PushState::GrantedUnsubscribed, None),
            Some(subscription) if self.resync_on_reconcile => {
                match self.api.register_subscription(&subscription).await {
                    Ok(()) => {
                        self.set_rejected(None);
                        (PushState::GrantedSubscribed, None)
                    }
                    Err(err) => {
                        tracing::warn!("re-registering existing subscription failed: {}", err);
                        let notice = Notice::warning(
                            "Push could not be confirmed with the server. Activate it again to retry.",
                        );
                        (PushState::GrantedUnsubscribed, Some(notice))
                    }
                }
            }
            Some(subscription) if self.was_rejected(&subscription.endpoint) => {
                tracing::debug!("local subscription was rejected by the server, not reporting it");
                (PushState::GrantedUnsubscribed, None)
            }
            Some(_) => (PushState::GrantedSubscribed, None),
        }
    }

    fn was_rejected(&self, endpoint: &str) -> bool {
        self.inner.lock().rejected_endpoint.as_deref() == Some(endpoint)
    }

    fn set_rejected(&self, endpoint: Option<String>) {
        self.inner.lock().rejected_endpoint = endpoint;
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Enable push: prompt if undecided, then subscribe. Call from a click handler.
    pub async fn activate(&self) -> ActionReport {
        let Some(guard) = self.try_begin() else {
            return self.skipped_busy("activate");
        };
        let result = self.try_activate().await;
        drop(guard);
        self.finish("activate", result)
    }

    /// Disable push on this device.
    pub async fn deactivate(&self) -> ActionReport {
        let Some(guard) = self.try_begin() else {
            return self.skipped_busy("deactivate");
        };
        let result = self.try_deactivate().await;
        drop(guard);
        self.finish("deactivate", result)
    }

    /// Ask the server to send a test notification to this device.
    pub async fn send_test(&self) -> ActionReport {
        let Some(guard) = self.try_begin() else {
            return self.skipped_busy("send_test");
        };
        let result = self.try_send_test().await;
        drop(guard);
        self.finish("send_test", result)
    }

    fn try_begin(&self) -> Option<BusyGuard<'_>> {
        let mut inner = self.inner.lock();
        if inner.busy {
            return None;
        }
        inner.busy = true;
        inner.epoch += 1;
        Some(BusyGuard { inner: &self.inner })
    }

    fn skipped_busy(&self, action: &str) -> ActionReport {
        tracing::debug!("{} ignored: another action is in flight", action);
        ActionReport {
            outcome: ActionOutcome::Skipped,
            ui: self.ui_state(),
            notice: None,
        }
    }

    fn finish(&self, action: &str, result: crate::Result<Done>) -> ActionReport {
        let (outcome, notice) = match result {
            Ok(done) => (done.outcome, done.notice),
            Err(err) => {
                if err.is_transient() {
                    tracing::warn!("{} failed: {}", action, err);
                } else {
                    tracing::info!("{} did not complete: {}", action, err);
                }
                let notice = Notice::error(&err);
                (ActionOutcome::Failed(err), Some(notice))
            }
        };

        let mut inner = self.inner.lock();
        inner.notice = notice.clone();
        ActionReport {
            outcome,
            ui: inner.state.ui(inner.busy),
            notice,
        }
    }

    fn set_state(&self, state: PushState) {
        let mut inner = self.inner.lock();
        if inner.state != state {
            tracing::debug!("{} -> {}", inner.state, state);
            inner.state = state;
        }
    }

    async fn try_activate(&self) -> crate::Result<Done> {
        let capability = self.capability();
        if !capability.is_supported() {
            self.set_state(PushState::Unsupported);
            return Err(PushError::Unsupported);
        }

        // Permission may have changed in browser settings since the last reconcile
        let mut status = permission::read_status(&self.runtime);
        if status.is_granted() && self.state().is_subscribed() {
            return Ok(Done::skipped(None));
        }

        if status == PermissionStatus::Default {
            status = permission::request_permission(&self.runtime).await?;
        }

        match status {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => {
                self.set_state(PushState::Denied);
                return Err(PushError::PermissionDenied);
            }
            PermissionStatus::Default => {
                self.set_state(PushState::Unprompted);
                return Ok(Done::skipped(Some(Notice::new(
                    NoticeLevel::Info,
                    "Notification permission was not granted. You can enable push at any time.",
                ))));
            }
        }

        if !self.state().is_granted() {
            self.set_state(PushState::GrantedUnsubscribed);
        }

        self.subscribe_flow().await?;
        tracing::info!("push notifications activated");
        Ok(Done::completed(Notice::success("Push notifications are now active.")))
    }

    /// Reuse or create the push-manager subscription, then register it.
    async fn subscribe_flow(&self) -> crate::Result<()> {
        let subscription = match self.runtime.get_subscription().await? {
            Some(existing) => {
                tracing::debug!("reusing existing push subscription");
                existing
            }
            None => {
                let key = self.api.fetch_vapid_public_key().await?;
                let application_server_key = codec::decode_vapid_key(&key)?;
                self.runtime.subscribe(&application_server_key).await?
            }
        };

        if let Err(err) = self.api.register_subscription(&subscription).await {
            if !self.rollback().await {
                self.set_rejected(Some(subscription.endpoint));
            }
            self.set_state(PushState::GrantedUnsubscribed);
            return Err(err);
        }

        self.set_rejected(None);
        self.set_state(PushState::GrantedSubscribed);
        Ok(())
    }

    /// Remove a local subscription the server never accepted. Returns false if it is still there.
    async fn rollback(&self) -> bool {
        match self.runtime.unsubscribe().await {
            Ok(_) => {
                tracing::info!("rolled back local push subscription");
                true
            }
            Err(err) => {
                tracing::warn!("rollback of local push subscription failed: {}", err);
                false
            }
        }
    }

    async fn try_deactivate(&self) -> crate::Result<Done> {
        if !self.state().is_subscribed() {
            return Ok(Done::skipped(None));
        }

        self.runtime.unsubscribe().await?;
        self.set_rejected(None);
        self.set_state(PushState::GrantedUnsubscribed);

        match self.api.deregister_subscription().await {
            Ok(()) => {
                tracing::info!("push notifications deactivated");
                Ok(Done::completed(Notice::success("Push notifications were turned off.")))
            }
            Err(err) => {
                tracing::warn!("server deregistration failed, record may be stale: {}", err);
                Ok(Done {
                    outcome: ActionOutcome::Degraded(err),
                    notice: Some(Notice::warning(
                        "Push was turned off on this device, but the server could not be updated.",
                    )),
                })
            }
        }
    }

    async fn try_send_test(&self) -> crate::Result<Done> {
        if !self.state().is_subscribed() {
            return Err(PushError::NotSubscribed);
        }
        self.api.send_test_notification().await?;
        Ok(Done::completed(Notice::success("Test notification sent.")))
    }
}
