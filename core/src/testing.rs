//! In-memory fakes for the push runtime and the server bridge.
//!
//! Both fakes suspend once at every async call so tests can interleave
//! concurrent actions on a single-threaded executor, the way a browser event
//! loop interleaves click handlers.

use crate::api::SubscriptionApi;
use crate::capability::NotificationCapability;
use crate::permission::PermissionStatus;
use crate::runtime::{PushRuntime, PushSubscription};
use crate::PushError;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::yield_now;

/// A valid uncompressed P-256 public key, base64url encoded.
pub const TEST_VAPID_KEY: &str =
    "BCVxsr7N_eNgVRqvHtD0zTZsEc6-VV-JvLexhqUzORcxaOzi6-AYWXvTBHm4bjyPjs7Vd8pZGH6SRpkNtoIAiw4";

pub fn sample_subscription(n: u32) -> PushSubscription {
    PushSubscription::new(
        format!("https://push.example.com/send/{n}"),
        "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM",
        "tBHItJI5svbpez7KI4CCXg",
    )
}

#[derive(Debug)]
struct RuntimeState {
    capability: NotificationCapability,
    permission: PermissionStatus,
    prompt_answer: PermissionStatus,
    subscription: Option<PushSubscription>,
    subscribe_error: Option<PushError>,
    unsubscribe_error: Option<PushError>,
    last_key: Option<Vec<u8>>,
    prompts: usize,
    subscribes: usize,
    unsubscribes: usize,
    next_id: u32,
}

/// Browser stand-in: permission, prompt answer and push manager in memory.
#[derive(Debug)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    /// Fully capable browser, permission not asked yet, prompt will be dismissed.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RuntimeState {
                capability: NotificationCapability::full(),
                permission: PermissionStatus::Default,
                prompt_answer: PermissionStatus::Default,
                subscription: None,
                subscribe_error: None,
                unsubscribe_error: None,
                last_key: None,
                prompts: 0,
                subscribes: 0,
                unsubscribes: 0,
                next_id: 1,
            }),
        }
    }

    pub fn with_capability(mut self, capability: NotificationCapability) -> Self {
        self.state.get_mut().capability = capability;
        self
    }

    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.state.get_mut().permission = permission;
        self
    }

    pub fn answer_prompt_with(mut self, answer: PermissionStatus) -> Self {
        self.state.get_mut().prompt_answer = answer;
        self
    }

    pub fn with_subscription(mut self, subscription: PushSubscription) -> Self {
        self.state.get_mut().subscription = Some(subscription);
        self
    }

    pub fn failing_subscribe(mut self, err: PushError) -> Self {
        self.state.get_mut().subscribe_error = Some(err);
        self
    }

    pub fn failing_unsubscribe(mut self, err: PushError) -> Self {
        self.state.get_mut().unsubscribe_error = Some(err);
        self
    }

    /// Simulate the user changing the permission in browser settings.
    pub fn set_permission(&self, permission: PermissionStatus) {
        self.state.lock().permission = permission;
    }

    pub fn prompt_count(&self) -> usize {
        self.state.lock().prompts
    }

    pub fn subscribe_count(&self) -> usize {
        self.state.lock().subscribes
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.state.lock().unsubscribes
    }

    pub fn has_subscription(&self) -> bool {
        self.state.lock().subscription.is_some()
    }

    pub fn subscription(&self) -> Option<PushSubscription> {
        self.state.lock().subscription.clone()
    }

    pub fn last_application_server_key(&self) -> Option<Vec<u8>> {
        self.state.lock().last_key.clone()
    }
}

#[async_trait(?Send)]
impl PushRuntime for FakeRuntime {
    fn probe(&self) -> NotificationCapability {
        self.state.lock().capability
    }

    fn permission(&self) -> PermissionStatus {
        self.state.lock().permission
    }

    async fn request_permission(&self) -> crate::Result<PermissionStatus> {
        self.state.lock().prompts += 1;
        yield_now().await;
        let mut state = self.state.lock();
        if state.permission == PermissionStatus::Default {
            state.permission = state.prompt_answer;
        }
        Ok(state.permission)
    }

    async fn get_subscription(&self) -> crate::Result<Option<PushSubscription>> {
        yield_now().await;
        Ok(self.state.lock().subscription.clone())
    }

    async fn subscribe(&self, application_server_key: &[u8]) -> crate::Result<PushSubscription> {
        self.state.lock().subscribes += 1;
        yield_now().await;
        let mut state = self.state.lock();
        if let Some(err) = state.subscribe_error.clone() {
            return Err(err);
        }
        if state.permission != PermissionStatus::Granted {
            return Err(PushError::Runtime("permission not granted".to_string()));
        }
        state.last_key = Some(application_server_key.to_vec());
        if let Some(existing) = state.subscription.clone() {
            return Ok(existing);
        }
        let subscription = sample_subscription(state.next_id);
        state.next_id += 1;
        state.subscription = Some(subscription.clone());
        Ok(subscription)
    }

    async fn unsubscribe(&self) -> crate::Result<bool> {
        self.state.lock().unsubscribes += 1;
        yield_now().await;
        let mut state = self.state.lock();
        if let Some(err) = state.unsubscribe_error.clone() {
            return Err(err);
        }
        Ok(state.subscription.take().is_some())
    }
}

#[derive(Debug)]
struct ApiState {
    vapid_key: String,
    record: Option<PushSubscription>,
    key_error: Option<PushError>,
    register_error: Option<PushError>,
    deregister_error: Option<PushError>,
    test_error: Option<PushError>,
    key_fetches: usize,
    registrations: usize,
    deregistrations: usize,
    tests_sent: usize,
}

/// Backend stand-in holding a single subscription record.
#[derive(Debug)]
pub struct FakeApi {
    state: Mutex<ApiState>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ApiState {
                vapid_key: TEST_VAPID_KEY.to_string(),
                record: None,
                key_error: None,
                register_error: None,
                deregister_error: None,
                test_error: None,
                key_fetches: 0,
                registrations: 0,
                deregistrations: 0,
                tests_sent: 0,
            }),
        }
    }

    pub fn with_vapid_key(mut self, key: impl Into<String>) -> Self {
        self.state.get_mut().vapid_key = key.into();
        self
    }

    pub fn failing_key_fetch(mut self, err: PushError) -> Self {
        self.state.get_mut().key_error = Some(err);
        self
    }

    pub fn failing_register(mut self, err: PushError) -> Self {
        self.state.get_mut().register_error = Some(err);
        self
    }

    pub fn failing_deregister(mut self, err: PushError) -> Self {
        self.state.get_mut().deregister_error = Some(err);
        self
    }

    pub fn failing_test(mut self, err: PushError) -> Self {
        self.state.get_mut().test_error = Some(err);
        self
    }

    /// Let registrations succeed again.
    pub fn recover(&self) {
        let mut state = self.state.lock();
        state.register_error = None;
        state.deregister_error = None;
    }

    pub fn key_fetch_count(&self) -> usize {
        self.state.lock().key_fetches
    }

    pub fn register_count(&self) -> usize {
        self.state.lock().registrations
    }

    pub fn deregister_count(&self) -> usize {
        self.state.lock().deregistrations
    }

    pub fn test_count(&self) -> usize {
        self.state.lock().tests_sent
    }

    pub fn record(&self) -> Option<PushSubscription> {
        self.state.lock().record.clone()
    }
}

#[async_trait(?Send)]
impl SubscriptionApi for FakeApi {
    async fn fetch_vapid_public_key(&self) -> crate::Result<String> {
        self.state.lock().key_fetches += 1;
        yield_now().await;
        let state = self.state.lock();
        match state.key_error.clone() {
            Some(err) => Err(err),
            None => Ok(state.vapid_key.clone()),
        }
    }

    async fn register_subscription(&self, subscription: &PushSubscription) -> crate::Result<()> {
        self.state.lock().registrations += 1;
        yield_now().await;
        let mut state = self.state.lock();
        if let Some(err) = state.register_error.clone() {
            return Err(err);
        }
        state.record = Some(subscription.clone());
        Ok(())
    }

    async fn deregister_subscription(&self) -> crate::Result<()> {
        self.state.lock().deregistrations += 1;
        yield_now().await;
        let mut state = self.state.lock();
        if let Some(err) = state.deregister_error.clone() {
            return Err(err);
        }
        state.record = None;
        Ok(())
    }

    async fn send_test_notification(&self) -> crate::Result<()> {
        self.state.lock().tests_sent += 1;
        yield_now().await;
        let state = self.state.lock();
        match state.test_error.clone() {
            Some(err) => Err(err),
            None if state.record.is_some() => Ok(()),
            None => Err(PushError::Server {
                status: 404,
                body: "no subscription".to_string(),
            }),
        }
    }
}
