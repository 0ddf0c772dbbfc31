//! # Password Strength Levels
//!
//! The ordered six-level scale produced by the scorer in
//! `parkwiz-validation`. It lives here so configuration can name a minimum
//! level without depending on the scorer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discrete password strength, totally ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PasswordStrengthLevel {
    VeryWeak = 0,
    Weak = 1,
    Fair = 2,
    Good = 3,
    Strong = 4,
    VeryStrong = 5,
}

impl PasswordStrengthLevel {
    /// All levels in ascending order.
    pub const ALL: [PasswordStrengthLevel; 6] = [
        Self::VeryWeak,
        Self::Weak,
        Self::Fair,
        Self::Good,
        Self::Strong,
        Self::VeryStrong,
    ];

    /// Map a point total to a level. Totals above 5 saturate.
    pub fn from_points(points: u8) -> Self {
        match points {
            0 => Self::VeryWeak,
            1 => Self::Weak,
            2 => Self::Fair,
            3 => Self::Good,
            4 => Self::Strong,
            _ => Self::VeryStrong,
        }
    }

    /// Points this level corresponds to (0-5).
    pub fn points(&self) -> u8 {
        *self as u8
    }

    /// Whether this level is at least `minimum`.
    pub fn meets(&self, minimum: PasswordStrengthLevel) -> bool {
        *self >= minimum
    }

    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryWeak => "very_weak",
            Self::Weak => "weak",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Strong => "strong",
            Self::VeryStrong => "very_strong",
        }
    }
}

impl fmt::Display for PasswordStrengthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a strength level name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown password strength level: {0}")]
pub struct UnknownStrengthLevel(pub String);

impl FromStr for PasswordStrengthLevel {
    type Err = UnknownStrengthLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| UnknownStrengthLevel(s.to_string()))
    }
}
