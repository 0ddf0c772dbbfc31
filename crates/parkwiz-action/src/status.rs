//! Observable state of a coordinator.

use std::fmt;

use serde::{Deserialize, Serialize};

use parkwiz_core::{ErrorKind, OperationId};

/// Where the coordinator's action currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed(ErrorKind),
}

impl ActionStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether the last run has settled (`Succeeded` or `Failed`).
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }

    pub fn failure(&self) -> Option<&ErrorKind> {
        match self {
            Self::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Running => write!(f, "RUNNING"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed(kind) => write!(f, "FAILED({})", kind.code()),
        }
    }
}

/// Snapshot published to hosts for spinners, banners, and countdown text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AsyncOperationState {
    pub status: ActionStatus,
    /// Operation of the most recent run, if any.
    pub operation: Option<OperationId>,
    /// Seconds until the action may run again. Only decreases while ticking.
    pub cooldown_remaining_secs: u32,
    /// Incremented by every accepted `run`.
    pub run_seq: u64,
}

impl AsyncOperationState {
    /// Whether the host should enable the triggering control.
    pub fn is_available(&self) -> bool {
        !self.status.is_running() && self.cooldown_remaining_secs == 0
    }
}
