//! # Password Strength Scoring
//!
//! Rule-based and deterministic. One point each for:
//!
//! 1. at least [`MIN_LENGTH_FOR_POINT`] characters,
//! 2. an ASCII uppercase letter,
//! 3. an ASCII lowercase letter,
//! 4. an ASCII digit,
//! 5. any character that is not an ASCII letter or digit.
//!
//! The total (0-5) maps directly onto [`PasswordStrengthLevel`]. The empty
//! password is always `VeryWeak`. Cost is one pass over the characters.

use serde::Serialize;

use parkwiz_core::PasswordStrengthLevel;

/// Length (in characters) that earns the length point.
pub const MIN_LENGTH_FOR_POINT: usize = 8;

/// The individual criteria behind a score, for requirement checklists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrengthReport {
    pub has_min_length: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digit: bool,
    pub has_symbol: bool,
    pub level: PasswordStrengthLevel,
}

impl StrengthReport {
    /// Number of satisfied criteria.
    pub fn points(&self) -> u8 {
        [
            self.has_min_length,
            self.has_uppercase,
            self.has_lowercase,
            self.has_digit,
            self.has_symbol,
        ]
        .into_iter()
        .filter(|met| *met)
        .count() as u8
    }
}

/// Score a password.
pub fn score(password: &str) -> PasswordStrengthLevel {
    report(password).level
}

/// Score a password and return every criterion.
pub fn report(password: &str) -> StrengthReport {
    let mut length = 0usize;
    let mut has_uppercase = false;
    let mut has_lowercase = false;
    let mut has_digit = false;
    let mut has_symbol = false;

    for c in password.chars() {
        length += 1;
        if c.is_ascii_uppercase() {
            has_uppercase = true;
        } else if c.is_ascii_lowercase() {
            has_lowercase = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else {
            has_symbol = true;
        }
    }

    let mut report = StrengthReport {
        has_min_length: length >= MIN_LENGTH_FOR_POINT,
        has_uppercase,
        has_lowercase,
        has_digit,
        has_symbol,
        level: PasswordStrengthLevel::VeryWeak,
    };
    if length > 0 {
        report.level = PasswordStrengthLevel::from_points(report.points());
    }
    report
}
