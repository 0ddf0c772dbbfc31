//! # Field Rules
//!
//! A [`Rule`] checks one field's raw value, optionally consulting other
//! fields through a [`ValidationContext`]. A [`FieldRule`] binds a list of
//! rules to a field together with the required gate:
//!
//! - absent or blank value, field required → `Invalid(Required)`
//! - absent or blank value, field optional → `Valid` (checks are skipped)
//! - otherwise the checks run in order and the first failure wins
//!
//! Rules never panic. A fault inside a caller supplied [`CustomValidator`]
//! is caught and reported as `Invalid(InternalError)`.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use parkwiz_core::{ErrorKind, FieldId, PasswordStrengthLevel};

use crate::strength::score;

/// Current values of every field in a wizard, keyed by field name.
pub type FieldValues = HashMap<FieldId, String>;

/// Outcome of checking one value. Exactly one variant is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    Invalid(ErrorKind),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The failure reason, if any.
    pub fn error(&self) -> Option<&ErrorKind> {
        match self {
            Self::Valid => None,
            Self::Invalid(kind) => Some(kind),
        }
    }
}

impl From<Result<(), ErrorKind>> for ValidationResult {
    fn from(r: Result<(), ErrorKind>) -> Self {
        match r {
            Ok(()) => Self::Valid,
            Err(kind) => Self::Invalid(kind),
        }
    }
}

/// Read-only view of the other fields, for cross-field rules.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    values: &'a FieldValues,
}

impl<'a> ValidationContext<'a> {
    pub fn new(values: &'a FieldValues) -> Self {
        Self { values }
    }

    /// Current value of `field`, if it has been set.
    pub fn value_of(&self, field: &str) -> Option<&'a str> {
        self.values.get(field).map(String::as_str)
    }
}

/// Whether a raw value counts as "not provided".
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

type CheckFn = dyn Fn(&str, &ValidationContext<'_>) -> ValidationResult + Send + Sync;

/// A named, caller supplied check.
#[derive(Clone)]
pub struct CustomValidator {
    name: String,
    check: Arc<CheckFn>,
}

impl CustomValidator {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&str, &ValidationContext<'_>) -> ValidationResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A single check applied to a field's raw value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Value contains at least one non-whitespace character.
    NonEmpty,
    /// `local "@" domain "." tld` with no whitespace.
    Email,
    /// At least `min` characters.
    MinLength { min: usize },
    /// Equal to the current value of another field.
    Matches { field: FieldId },
    /// Password scores at least `level`.
    MinStrength { level: PasswordStrengthLevel },
    /// A checkbox that must be ticked (`"true"`).
    Accepted,
    /// A whole number greater than zero.
    PositiveInteger,
    /// Caller supplied check. Not representable in configuration files.
    #[serde(skip)]
    Custom(CustomValidator),
}

impl Rule {
    /// Check `value` (the raw value of `field`) against this rule.
    pub fn validate(
        &self,
        field: &FieldId,
        value: &str,
        ctx: &ValidationContext<'_>,
    ) -> ValidationResult {
        match self {
            Self::NonEmpty => {
                if is_blank(value) {
                    ValidationResult::Invalid(ErrorKind::Required)
                } else {
                    ValidationResult::Valid
                }
            }
            Self::Email => validate_email(value),
            Self::MinLength { min } => {
                if value.chars().count() < *min {
                    ValidationResult::Invalid(ErrorKind::TooShort { min: *min })
                } else {
                    ValidationResult::Valid
                }
            }
            Self::Matches { field: other } => {
                if ctx.value_of(other.as_str()).unwrap_or_default() == value {
                    ValidationResult::Valid
                } else {
                    ValidationResult::Invalid(ErrorKind::Mismatch)
                }
            }
            Self::MinStrength { level } => {
                if score(value).meets(*level) {
                    ValidationResult::Valid
                } else {
                    ValidationResult::Invalid(ErrorKind::TooWeak)
                }
            }
            Self::Accepted => {
                if value.trim().eq_ignore_ascii_case("true") {
                    ValidationResult::Valid
                } else {
                    ValidationResult::Invalid(ErrorKind::Required)
                }
            }
            Self::PositiveInteger => match value.trim().parse::<u64>() {
                Ok(n) if n > 0 => ValidationResult::Valid,
                _ => ValidationResult::Invalid(ErrorKind::InvalidFormat),
            },
            Self::Custom(custom) => {
                match catch_unwind(AssertUnwindSafe(|| (custom.check)(value, ctx))) {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::error!(
                            field = %field,
                            validator = %custom.name,
                            "custom validator panicked"
                        );
                        ValidationResult::Invalid(ErrorKind::InternalError)
                    }
                }
            }
        }
    }
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").ok())
        .as_ref()
}

fn validate_email(value: &str) -> ValidationResult {
    match email_pattern() {
        Some(re) if re.is_match(value) => ValidationResult::Valid,
        Some(_) => ValidationResult::Invalid(ErrorKind::InvalidFormat),
        None => {
            tracing::error!("email pattern failed to compile");
            ValidationResult::Invalid(ErrorKind::InternalError)
        }
    }
}

/// The rules bound to one field within one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: FieldId,
    pub required: bool,
    #[serde(default)]
    pub checks: Vec<Rule>,
    /// Value must not appear in snapshots or logs (passwords).
    #[serde(default)]
    pub sensitive: bool,
}

impl FieldRule {
    /// A field that must be provided.
    pub fn required(field: impl Into<FieldId>) -> Self {
        Self {
            field: field.into(),
            required: true,
            checks: Vec::new(),
            sensitive: false,
        }
    }

    /// A field that may be left blank; checks apply only when it is filled.
    pub fn optional(field: impl Into<FieldId>) -> Self {
        Self {
            required: false,
            ..Self::required(field)
        }
    }

    /// Append a check.
    pub fn check(mut self, rule: Rule) -> Self {
        self.checks.push(rule);
        self
    }

    /// Mark the value as secret.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Evaluate this field against the current values.
    pub fn evaluate(&self, values: &FieldValues) -> ValidationResult {
        let ctx = ValidationContext::new(values);
        let value = match ctx.value_of(self.field.as_str()) {
            Some(v) if !is_blank(v) => v,
            _ if self.required => return ValidationResult::Invalid(ErrorKind::Required),
            _ => return ValidationResult::Valid,
        };
        self.checks
            .iter()
            .map(|rule| rule.validate(&self.field, value, &ctx))
            .find(|result| !result.is_valid())
            .unwrap_or(ValidationResult::Valid)
    }
}
