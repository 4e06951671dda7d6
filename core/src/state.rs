//! Composite push state and the view-model projected from it.
//!
//! `PushState` is the explicit form of what a UI would otherwise track as a
//! handful of booleans. Combinations such as "subscribed without permission"
//! cannot be expressed.

use crate::capability::NotificationCapability;
use crate::permission::PermissionStatus;
use crate::PushError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PushState {
    /// A required browser API is missing
    #[default]
    Unsupported,
    /// Permission has not been asked for yet
    Unprompted,
    /// Permission was refused; only browser settings can change it
    Denied,
    /// Permission granted, no subscription registered
    GrantedUnsubscribed,
    /// Permission granted and the server holds this device's subscription
    GrantedSubscribed,
}

impl PushState {
    /// Derive the state from the three external sources of truth.
    pub fn from_parts(
        capability: NotificationCapability,
        permission: PermissionStatus,
        has_subscription: bool,
    ) -> Self {
        if !capability.is_supported() {
            return PushState::Unsupported;
        }
        match permission {
            PermissionStatus::Default => PushState::Unprompted,
            PermissionStatus::Denied => PushState::Denied,
            PermissionStatus::Granted if has_subscription => PushState::GrantedSubscribed,
            PermissionStatus::Granted => PushState::GrantedUnsubscribed,
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != PushState::Unsupported
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, PushState::GrantedUnsubscribed | PushState::GrantedSubscribed)
    }

    pub fn is_subscribed(&self) -> bool {
        *self == PushState::GrantedSubscribed
    }

    /// Whether an "activate" control should be offered at all.
    pub fn can_activate(&self) -> bool {
        matches!(self, PushState::Unprompted | PushState::GrantedUnsubscribed)
    }

    /// View-model for this state.
    pub fn ui(&self, loading: bool) -> UiState {
        UiState {
            supported: self.is_supported(),
            granted: self.is_granted(),
            subscribed: self.is_subscribed(),
            loading,
        }
    }

    /// Status line shown next to the controls.
    pub fn status_message(&self) -> &'static str {
        match self {
            PushState::Unsupported => "Push notifications are not supported by this browser.",
            PushState::Unprompted => "Push notifications are not enabled yet.",
            PushState::Denied => {
                "Notifications are blocked. Allow them in your browser settings to enable push."
            }
            PushState::GrantedUnsubscribed => {
                "Notifications are allowed but push is not active on this device."
            }
            PushState::GrantedSubscribed => "Push notifications are active on this device.",
        }
    }
}

impl fmt::Display for PushState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PushState::Unsupported => "Unsupported",
            PushState::Unprompted => "Unprompted",
            PushState::Denied => "Denied",
            PushState::GrantedUnsubscribed => "GrantedUnsubscribed",
            PushState::GrantedSubscribed => "GrantedSubscribed",
        };
        f.write_str(name)
    }
}

/// View-model consumed by the UI shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub supported: bool,
    pub granted: bool,
    pub subscribed: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, text)
    }

    pub fn error(err: &PushError) -> Self {
        // A refusal is the user's choice, not a malfunction
        let level = match err {
            PushError::PermissionDenied | PushError::Unsupported => NoticeLevel::Info,
            _ => NoticeLevel::Error,
        };
        Self::new(level, err.user_message())
    }
}

/// How an action handler finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action ran to completion
    Completed,
    /// Nothing was done: another action was in flight, or there was nothing to do
    Skipped,
    /// The local step succeeded but the best-effort server step failed
    Degraded(PushError),
    /// The action failed; state is the last known-good value
    Failed(PushError),
}

impl ActionOutcome {
    pub fn error(&self) -> Option<&PushError> {
        match self {
            ActionOutcome::Degraded(err) | ActionOutcome::Failed(err) => Some(err),
            ActionOutcome::Completed | ActionOutcome::Skipped => None,
        }
    }
}

/// Result of a user action, already converted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub outcome: ActionOutcome,
    pub ui: UiState,
    pub notice: Option<Notice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_wins_over_everything() {
        let state = PushState::from_parts(NotificationCapability::none(), PermissionStatus::Granted, true);
        assert_eq!(state, PushState::Unsupported);
        assert_eq!(
            state.ui(false),
            UiState { supported: false, granted: false, subscribed: false, loading: false }
        );
    }

    #[test]
    fn test_subscription_without_permission_is_not_subscribed() {
        // Permission revoked in browser settings while a subscription lingers
        let full = NotificationCapability::full();
        assert_eq!(PushState::from_parts(full, PermissionStatus::Denied, true), PushState::Denied);
        assert_eq!(PushState::from_parts(full, PermissionStatus::Default, true), PushState::Unprompted);
    }

    #[test]
    fn test_granted_states() {
        let full = NotificationCapability::full();
        assert_eq!(
            PushState::from_parts(full, PermissionStatus::Granted, false),
            PushState::GrantedUnsubscribed
        );
        let ui = PushState::from_parts(full, PermissionStatus::Granted, true).ui(true);
        assert_eq!(ui, UiState { supported: true, granted: true, subscribed: true, loading: true });
    }

    #[test]
    fn test_subscribed_implies_granted_for_every_state() {
        for state in [
            PushState::Unsupported,
            PushState::Unprompted,
            PushState::Denied,
            PushState::GrantedUnsubscribed,
            PushState::GrantedSubscribed,
        ] {
            let ui = state.ui(false);
            assert!(!ui.subscribed || (ui.granted && ui.supported), "{state}");
        }
    }

    #[test]
    fn test_denied_and_unprompted_messages_differ() {
        assert_ne!(PushState::Denied.status_message(), PushState::Unprompted.status_message());
        assert!(PushState::Unsupported.status_message().contains("not supported"));
    }

    #[test]
    fn test_ui_state_serializes_camel_case() {
        let json = serde_json::to_value(PushState::GrantedSubscribed.ui(false)).unwrap();
        assert_eq!(json["subscribed"], true);
        assert_eq!(json["loading"], false);
    }
}
