//! End-to-end activation scenarios against the in-memory browser and backend.

use pushsync_core::testing::{FakeApi, FakeRuntime};
use pushsync_core::{
    ActionOutcome, NotificationCapability, PermissionStatus, PushError, PushState,
    SubscriptionSynchronizer, UiState,
};

#[tokio::test]
async fn test_unsupported_browser_shows_not_supported() {
    let runtime = FakeRuntime::new().with_capability(NotificationCapability {
        supports_permission_api: false,
        ..NotificationCapability::full()
    });
    let sync = SubscriptionSynchronizer::new(runtime, FakeApi::new());

    let ui = sync.reconcile().await;
    assert_eq!(
        ui,
        UiState { supported: false, granted: false, subscribed: false, loading: false }
    );
    assert!(!sync.state().can_activate());
    assert!(sync.status_message().contains("not supported"));

    let report = sync.activate().await;
    assert_eq!(report.outcome, ActionOutcome::Failed(PushError::Unsupported));
    assert_eq!(sync.runtime().prompt_count(), 0);
}

#[tokio::test]
async fn test_default_permission_grant_and_subscribe() {
    let runtime = FakeRuntime::new().answer_prompt_with(PermissionStatus::Granted);
    let sync = SubscriptionSynchronizer::new(runtime, FakeApi::new());
    assert!(!sync.reconcile().await.granted);

    let report = sync.activate().await;
    assert_eq!(report.outcome, ActionOutcome::Completed);
    assert_eq!(
        report.ui,
        UiState { supported: true, granted: true, subscribed: true, loading: false }
    );
    assert_eq!(sync.runtime().prompt_count(), 1);
    assert_eq!(sync.api().register_count(), 1);
    assert!(sync.api().record().is_some());
}

#[tokio::test]
async fn test_default_permission_denied() {
    let runtime = FakeRuntime::new().answer_prompt_with(PermissionStatus::Denied);
    let sync = SubscriptionSynchronizer::new(runtime, FakeApi::new());
    sync.reconcile().await;
    let unprompted_message = sync.status_message();

    let report = sync.activate().await;
    assert_eq!(report.outcome, ActionOutcome::Failed(PushError::PermissionDenied));
    assert!(!report.ui.granted);
    assert!(!report.ui.subscribed);
    assert_eq!(sync.state(), PushState::Denied);
    assert_ne!(sync.status_message(), unprompted_message);
    assert_eq!(sync.api().key_fetch_count(), 0);
}

#[tokio::test]
async fn test_registration_rejected_rolls_back_local_subscription() {
    let runtime = FakeRuntime::new().answer_prompt_with(PermissionStatus::Granted);
    let api = FakeApi::new().failing_register(PushError::Registration {
        status: 400,
        body: "bad subscription".to_string(),
    });
    let sync = SubscriptionSynchronizer::new(runtime, api);

    let report = sync.activate().await;
    assert!(matches!(
        report.outcome,
        ActionOutcome::Failed(PushError::Registration { status: 400, .. })
    ));
    assert_eq!(sync.state(), PushState::GrantedUnsubscribed);
    assert_eq!(sync.runtime().subscribe_count(), 1);
    assert_eq!(sync.runtime().unsubscribe_count(), 1);
    assert!(!sync.runtime().has_subscription());

    // A fresh mount agrees with the rolled-back state
    assert!(!sync.reconcile().await.subscribed);
}

#[tokio::test]
async fn test_rapid_double_activation_runs_one_flow() {
    let runtime = FakeRuntime::new().answer_prompt_with(PermissionStatus::Granted);
    let sync = SubscriptionSynchronizer::new(runtime, FakeApi::new());
    sync.reconcile().await;

    let (first, second) = futures::join!(sync.activate(), sync.activate());

    assert_eq!(first.outcome, ActionOutcome::Completed);
    assert_eq!(second.outcome, ActionOutcome::Skipped);
    assert!(second.ui.loading);
    assert_eq!(sync.runtime().prompt_count(), 1);
    assert_eq!(sync.runtime().subscribe_count(), 1);
    assert_eq!(sync.api().register_count(), 1);
}

#[tokio::test]
async fn test_subscribed_never_observed_without_local_and_server_record() {
    let runtime = FakeRuntime::new().answer_prompt_with(PermissionStatus::Granted);
    let api = FakeApi::new().failing_register(PushError::Network("offline".into()));
    let sync = SubscriptionSynchronizer::new(runtime, api);

    let report = sync.activate().await;
    assert!(!report.ui.subscribed);
    assert!(sync.api().record().is_none());

    sync.api().recover();
    let report = sync.activate().await;
    assert!(report.ui.subscribed);
    assert!(sync.runtime().has_subscription());
    assert_eq!(sync.api().record(), sync.runtime().subscription());
}

#[tokio::test]
async fn test_full_lifecycle_with_reload() {
    let runtime = FakeRuntime::new().answer_prompt_with(PermissionStatus::Granted);
    let sync = SubscriptionSynchronizer::new(runtime, FakeApi::new());
    sync.reconcile().await;
    assert!(sync.activate().await.ui.subscribed);
    assert_eq!(sync.send_test().await.outcome, ActionOutcome::Completed);

    // Reload: a new synchronizer over the same browser rebuilds the state
    let sync = SubscriptionSynchronizer::new(
        FakeRuntime::new()
            .with_permission(PermissionStatus::Granted)
            .with_subscription(sync.runtime().subscription().unwrap()),
        FakeApi::new(),
    );
    assert_eq!(sync.ui_state(), UiState::default());
    assert!(sync.reconcile().await.subscribed);

    let report = sync.deactivate().await;
    assert_eq!(report.outcome, ActionOutcome::Completed);
    assert_eq!(
        report.ui,
        UiState { supported: true, granted: true, subscribed: false, loading: false }
    );
}
