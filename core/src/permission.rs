//! Permission coordinator
//!
//! The browser owns the permission. This module only reads it and asks for a
//! change; a denial is a normal answer, not a failure.

use crate::runtime::PushRuntime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification permission states as exposed by the Notifications API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// The user has not decided yet
    #[default]
    Default,
    /// The user allowed notifications
    Granted,
    /// The user blocked notifications; only browser settings can undo this
    Denied,
}

impl PermissionStatus {
    /// Parse the browser's permission string. Unknown values count as undecided.
    pub fn from_browser(value: &str) -> Self {
        match value {
            "granted" => PermissionStatus::Granted,
            "denied" => PermissionStatus::Denied,
            _ => PermissionStatus::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Default => "default",
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
        }
    }

    pub fn is_granted(&self) -> bool {
        *self == PermissionStatus::Granted
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current permission, read without side effects.
pub fn read_status<R: PushRuntime + ?Sized>(runtime: &R) -> PermissionStatus {
    runtime.permission()
}

/// Ask the user for permission.
///
/// Must only run as the direct result of a user gesture; the synchronizer
/// calls it from `activate` and nowhere else. Resolves immediately when the
/// user already decided.
pub async fn request_permission<R: PushRuntime + ?Sized>(
    runtime: &R,
) -> crate::Result<PermissionStatus> {
    let current = runtime.permission();
    if current != PermissionStatus::Default {
        tracing::debug!("permission already decided: {}", current);
        return Ok(current);
    }

    let answer = runtime.request_permission().await?;
    tracing::info!("permission prompt answered: {}", answer);
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRuntime;

    #[test]
    fn test_from_browser_strings() {
        assert_eq!(PermissionStatus::from_browser("granted"), PermissionStatus::Granted);
        assert_eq!(PermissionStatus::from_browser("denied"), PermissionStatus::Denied);
        assert_eq!(PermissionStatus::from_browser("default"), PermissionStatus::Default);
        assert_eq!(PermissionStatus::from_browser("prompt"), PermissionStatus::Default);
    }

    #[test]
    fn test_serde_uses_browser_strings() {
        let json = serde_json::to_string(&PermissionStatus::Granted).unwrap();
        assert_eq!(json, "\"granted\"");
    }

    #[tokio::test]
    async fn test_request_skips_prompt_when_decided() {
        let runtime = FakeRuntime::new().with_permission(PermissionStatus::Denied);
        let status = request_permission(&runtime).await.unwrap();
        assert_eq!(status, PermissionStatus::Denied);
        assert_eq!(runtime.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_request_prompts_when_undecided() {
        let runtime = FakeRuntime::new().answer_prompt_with(PermissionStatus::Granted);
        let status = request_permission(&runtime).await.unwrap();
        assert_eq!(status, PermissionStatus::Granted);
        assert_eq!(runtime.prompt_count(), 1);
        assert_eq!(read_status(&runtime), PermissionStatus::Granted);
    }
}
