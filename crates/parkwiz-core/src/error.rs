//! # Error Taxonomy
//!
//! A single tagged enum shared by every component of the engine. Validation
//! errors are resolved into `WizardState::field_errors`, async failures into
//! `ActionStatus::Failed`; neither is ever propagated as a Rust error past
//! the component that produced it.
//!
//! Each variant carries a stable snake_case [`ErrorKind::code`] the host
//! layer uses as a lookup key into its own message tables. The `Display`
//! output is an English fallback only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a field, step, or action did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// A mandatory field is absent or empty.
    #[error("this field is required")]
    Required,

    /// The value does not have the expected shape (e.g. malformed email).
    #[error("value has an invalid format")]
    InvalidFormat,

    /// The value has fewer characters than the rule demands.
    #[error("must be at least {min} characters")]
    TooShort {
        /// Minimum number of characters.
        min: usize,
    },

    /// A confirmation field differs from its source field.
    #[error("values do not match")]
    Mismatch,

    /// The password scores below the minimum strength enforced by the step.
    #[error("password is too weak")]
    TooWeak,

    /// At least one rule of the current step did not pass.
    #[error("the current step is incomplete")]
    StepIncomplete,

    /// The action is already running on this coordinator.
    #[error("action is already running")]
    Busy,

    /// The action is rate limited and may not run yet.
    #[error("action is cooling down, {remaining_secs}s remaining")]
    CoolingDown {
        /// Seconds until the action becomes available again.
        remaining_secs: u32,
    },

    /// A validator or work unit faulted.
    #[error("internal error")]
    InternalError,

    /// The backend does not know the requested account.
    #[error("account not found")]
    NotFound,

    /// An account with this identity already exists.
    #[error("account already exists")]
    AlreadyExists,

    /// No reset link has been sent to the entered address yet.
    #[error("no reset link has been sent to this address")]
    LinkNotSent,

    /// A link or token has expired.
    #[error("link has expired")]
    Expired,

    /// The backend could not be reached.
    #[error("network error")]
    NetworkError,

    /// The supplied credentials were rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The work unit did not settle within the coordinator's deadline.
    #[error("operation timed out")]
    Timeout,
}

impl ErrorKind {
    /// Stable machine-readable code, identical to the serde tag.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::InvalidFormat => "invalid_format",
            Self::TooShort { .. } => "too_short",
            Self::Mismatch => "mismatch",
            Self::TooWeak => "too_weak",
            Self::StepIncomplete => "step_incomplete",
            Self::Busy => "busy",
            Self::CoolingDown { .. } => "cooling_down",
            Self::InternalError => "internal_error",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::LinkNotSent => "link_not_sent",
            Self::Expired => "expired",
            Self::NetworkError => "network_error",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Timeout => "timeout",
        }
    }

    /// Whether this error describes a single field's value.
    pub fn is_field_error(&self) -> bool {
        matches!(
            self,
            Self::Required
                | Self::InvalidFormat
                | Self::TooShort { .. }
                | Self::Mismatch
                | Self::TooWeak
                | Self::InternalError
        )
    }

    /// Whether retrying the same action later can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Busy | Self::CoolingDown { .. } | Self::NetworkError | Self::Timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_serde_tag() {
        let samples = [
            ErrorKind::Required,
            ErrorKind::InvalidFormat,
            ErrorKind::TooShort { min: 8 },
            ErrorKind::Mismatch,
            ErrorKind::TooWeak,
            ErrorKind::StepIncomplete,
            ErrorKind::Busy,
            ErrorKind::CoolingDown { remaining_secs: 3 },
            ErrorKind::InternalError,
            ErrorKind::NotFound,
            ErrorKind::AlreadyExists,
            ErrorKind::LinkNotSent,
            ErrorKind::Expired,
            ErrorKind::NetworkError,
            ErrorKind::InvalidCredentials,
            ErrorKind::Timeout,
        ];
        for kind in samples {
            let json = serde_json::to_value(&kind).unwrap();
            assert_eq!(json["kind"], kind.code(), "tag mismatch for {kind:?}");
        }
    }

    #[test]
    fn struct_variants_keep_their_payload() {
        let json = serde_json::to_string(&ErrorKind::TooShort { min: 8 }).unwrap();
        assert_eq!(json, r#"{"kind":"too_short","min":8}"#);
        let parsed: ErrorKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ErrorKind::TooShort { min: 8 });
    }

    #[test]
    fn display_includes_payload() {
        assert_eq!(
            ErrorKind::CoolingDown { remaining_secs: 42 }.to_string(),
            "action is cooling down, 42s remaining"
        );
        assert_eq!(
            ErrorKind::TooShort { min: 8 }.to_string(),
            "must be at least 8 characters"
        );
    }

    #[test]
    fn classification() {
        assert!(ErrorKind::Mismatch.is_field_error());
        assert!(!ErrorKind::Busy.is_field_error());
        assert!(ErrorKind::NetworkError.is_transient());
        assert!(!ErrorKind::NotFound.is_transient());
    }
}
