//! Engine configuration.
//!
//! Tunables shared by every flow: password policy, resend cooldown, backend
//! latency for the in-memory backend, and the coordinator deadline. Defaults
//! match the dashboard's behaviour. Override via environment variables or a
//! YAML file loaded by the host.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::strength::PasswordStrengthLevel;

/// Configuration consumed by flow constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Minimum password length in characters. Default: 8.
    pub password_min_length: usize,
    /// Minimum strength a new password must reach, if enforced.
    pub min_password_strength: Option<PasswordStrengthLevel>,
    /// Seconds the resend action stays disabled after a link is sent. Default: 60.
    pub resend_cooldown_secs: u32,
    /// Simulated round trip of the in-memory backend, in milliseconds. Default: 1500.
    pub backend_latency_ms: u64,
    /// Deadline for a single async action, in seconds. `None` waits forever.
    pub action_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            password_min_length: 8,
            min_password_strength: None,
            resend_cooldown_secs: 60,
            backend_latency_ms: 1500,
            action_timeout_secs: Some(30),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PARKWIZ_PASSWORD_MIN_LENGTH` (default: 8)
    /// - `PARKWIZ_MIN_PASSWORD_STRENGTH` (level name, e.g. `good`; default: unset)
    /// - `PARKWIZ_RESEND_COOLDOWN_SECS` (default: 60)
    /// - `PARKWIZ_BACKEND_LATENCY_MS` (default: 1500)
    /// - `PARKWIZ_ACTION_TIMEOUT_SECS` (default: 30, `0` disables)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Absent keys keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("PARKWIZ_PASSWORD_MIN_LENGTH") {
            cfg.password_min_length = parse_var("PARKWIZ_PASSWORD_MIN_LENGTH", &raw)?;
        }
        if let Some(raw) = lookup("PARKWIZ_MIN_PASSWORD_STRENGTH") {
            let level = raw
                .parse::<PasswordStrengthLevel>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "PARKWIZ_MIN_PASSWORD_STRENGTH".to_string(),
                    reason: e.to_string(),
                })?;
            cfg.min_password_strength = Some(level);
        }
        if let Some(raw) = lookup("PARKWIZ_RESEND_COOLDOWN_SECS") {
            cfg.resend_cooldown_secs = parse_var("PARKWIZ_RESEND_COOLDOWN_SECS", &raw)?;
        }
        if let Some(raw) = lookup("PARKWIZ_BACKEND_LATENCY_MS") {
            cfg.backend_latency_ms = parse_var("PARKWIZ_BACKEND_LATENCY_MS", &raw)?;
        }
        if let Some(raw) = lookup("PARKWIZ_ACTION_TIMEOUT_SECS") {
            let secs: u64 = parse_var("PARKWIZ_ACTION_TIMEOUT_SECS", &raw)?;
            cfg.action_timeout_secs = (secs > 0).then_some(secs);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a YAML file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.password_min_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "password_min_length".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.action_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "action_timeout_secs".to_string(),
                reason: "use null to disable the deadline".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}
