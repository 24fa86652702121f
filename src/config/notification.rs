// ABOUTME: Notification policy deciding which outcomes reach the mail dispatcher.
// ABOUTME: never, on_error (failures only) or all.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPolicy {
    Never,
    #[default]
    #[serde(alias = "onError")]
    OnError,
    All,
}

impl NotificationPolicy {
    /// Whether an outcome with the given success flag is dispatched.
    pub fn should_send(&self, success: bool) -> bool {
        match self {
            NotificationPolicy::Never => false,
            NotificationPolicy::OnError => !success,
            NotificationPolicy::All => true,
        }
    }
}

impl FromStr for NotificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(NotificationPolicy::Never),
            "on_error" | "onError" => Ok(NotificationPolicy::OnError),
            "all" => Ok(NotificationPolicy::All),
            _ => Err(format!("unknown notification policy: {}", s)),
        }
    }
}

impl fmt::Display for NotificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationPolicy::Never => write!(f, "never"),
            NotificationPolicy::OnError => write!(f, "on_error"),
            NotificationPolicy::All => write!(f, "all"),
        }
    }
}
