//! # Wizard Controller
//!
//! The controller exclusively owns [`WizardState`]. Hosts mutate it through
//! three intents (`set_field`, `advance`, `back`) plus an explicit
//! `validate_current_step`, and read it back through [`WizardSnapshot`].
//!
//! ## Invariants
//!
//! - `current_step_index` is always within `0..step_count`.
//! - `field_errors` never holds an entry for a field whose latest
//!   validation was `Valid`.
//! - `advance` never triggers submission. On the last step it is a no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parkwiz_core::{ErrorKind, FieldId, PasswordStrengthLevel, StepId};
use parkwiz_validation::{score, FieldValues, StepEvaluation};

use crate::step::{StepDefinition, WizardError};

/// Placeholder shown in snapshots instead of sensitive values.
pub const REDACTED: &str = "[REDACTED]";

// ─── State ───────────────────────────────────────────────────────────

/// Mutable state of one wizard instance.
#[derive(Clone, Default)]
pub struct WizardState {
    current_step_index: usize,
    field_values: FieldValues,
    field_errors: BTreeMap<FieldId, ErrorKind>,
}

impl WizardState {
    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn field_values(&self) -> &FieldValues {
        &self.field_values
    }

    pub fn field_errors(&self) -> &BTreeMap<FieldId, ErrorKind> {
        &self.field_errors
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.field_values.get(field).map(String::as_str)
    }
}

// Values may hold passwords; only the field names are printed.
impl fmt::Debug for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: BTreeSet<&str> = self.field_values.keys().map(FieldId::as_str).collect();
        f.debug_struct("WizardState")
            .field("current_step_index", &self.current_step_index)
            .field("fields", &fields)
            .field("field_errors", &self.field_errors)
            .finish()
    }
}

// ─── Outcomes & records ──────────────────────────────────────────────

/// Result of a navigation intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Moved forward one step.
    Advanced,
    /// Moved back one step.
    WentBack,
    /// Nothing to do (first step on `back`, last step on `advance`).
    NoOp,
    /// Forward move blocked. The wizard's own gate reports
    /// `StepIncomplete`; pages may report a more specific reason.
    Invalid(ErrorKind),
}

impl NavigationOutcome {
    /// Whether the current step changed.
    pub fn moved(&self) -> bool {
        matches!(self, Self::Advanced | Self::WentBack)
    }
}

/// Record of one step change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRecord {
    pub from_step: StepId,
    pub to_step: StepId,
    pub timestamp: DateTime<Utc>,
}

/// Read-only view handed to the host for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WizardSnapshot {
    pub step_index: usize,
    pub step_id: StepId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_title: Option<String>,
    pub step_count: usize,
    pub is_first_step: bool,
    pub is_last_step: bool,
    /// Whether the current step would pass validation right now.
    pub can_advance: bool,
    /// Field values; sensitive fields are replaced by [`REDACTED`].
    pub values: BTreeMap<FieldId, String>,
    pub errors: BTreeMap<FieldId, ErrorKind>,
}

// ─── Controller ──────────────────────────────────────────────────────

/// Ordered steps plus the state that walks them.
pub struct WizardController {
    steps: Vec<StepDefinition>,
    state: WizardState,
    sensitive: BTreeSet<FieldId>,
    history: Vec<NavigationRecord>,
}

impl WizardController {
    /// Build a wizard. Step indices are assigned from list order.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::NoSteps);
        }

        let mut steps = steps;
        let mut ids = BTreeSet::new();
        let mut sensitive = BTreeSet::new();
        for (index, step) in steps.iter_mut().enumerate() {
            step.index = index;
            step.check_structure()?;
            if !ids.insert(step.id.clone()) {
                return Err(WizardError::DuplicateStep {
                    id: step.id.to_string(),
                });
            }
            sensitive.extend(
                step.rules
                    .iter()
                    .filter(|r| r.sensitive)
                    .map(|r| r.field.clone()),
            );
        }

        Ok(Self {
            steps,
            state: WizardState::default(),
            sensitive,
            history: Vec::new(),
        })
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_index(&self) -> usize {
        self.state.current_step_index
    }

    pub fn current_step(&self) -> &StepDefinition {
        // Index is kept in range by every mutator.
        &self.steps[self.state.current_step_index]
    }

    pub fn is_last_step(&self) -> bool {
        self.state.current_step_index + 1 == self.steps.len()
    }

    /// Current value of a field.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.state.value(field)
    }

    /// Current error of a field.
    pub fn error_for(&self, field: &str) -> Option<&ErrorKind> {
        self.state.field_errors.get(field)
    }

    /// Ordered log of all step changes.
    pub fn history(&self) -> &[NavigationRecord] {
        &self.history
    }

    /// Update a field's value and clear its error. No validation runs here.
    pub fn set_field(&mut self, field: impl Into<FieldId>, value: impl Into<String>) {
        let field = field.into();
        self.state.field_errors.remove(&field);
        self.state.field_values.insert(field, value.into());
    }

    /// Evaluate the current step without touching state.
    pub fn evaluate_current_step(&self) -> StepEvaluation {
        self.current_step().evaluate(&self.state)
    }

    /// Whether `advance` would pass the validation gate right now.
    pub fn can_advance(&self) -> bool {
        self.evaluate_current_step().is_step_valid
    }

    /// Index of the first step whose rules do not pass, if any.
    ///
    /// Used before a terminal submit, since earlier values may have been
    /// edited after their step was left.
    pub fn first_invalid_step(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| !step.evaluate(&self.state).is_step_valid)
    }

    /// Evaluate the current step and merge its errors into state.
    pub fn validate_current_step(&mut self) -> StepEvaluation {
        let eval = self.evaluate_current_step();
        self.merge(&eval);
        eval
    }

    /// Evaluate the step at `index` and merge its errors into state.
    /// `None` if there is no such step.
    pub fn validate_step(&mut self, index: usize) -> Option<StepEvaluation> {
        let eval = self.steps.get(index)?.evaluate(&self.state);
        self.merge(&eval);
        Some(eval)
    }

    /// Move forward if the current step is valid.
    pub fn advance(&mut self) -> NavigationOutcome {
        let eval = self.validate_current_step();
        if !eval.is_step_valid {
            tracing::debug!(
                step = %self.current_step().id,
                failing = eval.errors.len(),
                "advance blocked by validation"
            );
            return NavigationOutcome::Invalid(ErrorKind::StepIncomplete);
        }
        if self.is_last_step() {
            return NavigationOutcome::NoOp;
        }
        self.move_to(self.state.current_step_index + 1);
        NavigationOutcome::Advanced
    }

    /// Move back one step. Never validated.
    pub fn back(&mut self) -> NavigationOutcome {
        if self.state.current_step_index == 0 {
            return NavigationOutcome::NoOp;
        }
        self.move_to(self.state.current_step_index - 1);
        NavigationOutcome::WentBack
    }

    /// Strength of the value currently held by `field` (empty if unset).
    pub fn password_strength(&self, field: &str) -> PasswordStrengthLevel {
        score(self.value(field).unwrap_or_default())
    }

    /// Return to the first step with no values, errors, or history.
    pub fn reset(&mut self) {
        self.state = WizardState::default();
        self.history.clear();
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let step = self.current_step();
        let values = self
            .state
            .field_values
            .iter()
            .map(|(field, value)| {
                let shown = if self.sensitive.contains(field) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (field.clone(), shown)
            })
            .collect();

        WizardSnapshot {
            step_index: self.state.current_step_index,
            step_id: step.id.clone(),
            step_title: step.title.clone(),
            step_count: self.steps.len(),
            is_first_step: self.state.current_step_index == 0,
            is_last_step: self.is_last_step(),
            can_advance: self.can_advance(),
            values,
            errors: self.state.field_errors.clone(),
        }
    }

    fn merge(&mut self, eval: &StepEvaluation) {
        for field in eval.checked_fields() {
            match eval.errors.get(field) {
                Some(kind) => {
                    self.state.field_errors.insert(field.clone(), kind.clone());
                }
                None => {
                    self.state.field_errors.remove(field);
                }
            }
        }
    }

    fn move_to(&mut self, index: usize) {
        let from = self.steps[self.state.current_step_index].id.clone();
        let to = self.steps[index].id.clone();
        tracing::debug!(from = %from, to = %to, "wizard step changed");
        self.history.push(NavigationRecord {
            from_step: from,
            to_step: to,
            timestamp: Utc::now(),
        });
        self.state.current_step_index = index;
    }
}

impl fmt::Debug for WizardController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.steps.iter().map(|s| s.id.as_str()).collect();
        f.debug_struct("WizardController")
            .field("steps", &ids)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parkwiz_validation::{FieldRule, Rule};

    fn two_step() -> WizardController {
        WizardController::new(vec![
            StepDefinition::new("contact").field(FieldRule::required("email").check(Rule::Email)),
            StepDefinition::new("secret").field(
                FieldRule::required("password")
                    .check(Rule::MinLength { min: 8 })
                    .sensitive(),
            ),
        ])
        .unwrap()
    }

    // ── Construction ─────────────────────────────────────────────────

    #[test]
    fn empty_step_list_is_rejected() {
        assert_eq!(
            WizardController::new(vec![]).unwrap_err(),
            WizardError::NoSteps
        );
    }

    #[test]
    fn duplicate_step_ids_are_rejected() {
        let err = WizardController::new(vec![StepDefinition::new("a"), StepDefinition::new("a")])
            .unwrap_err();
        assert!(matches!(err, WizardError::DuplicateStep { .. }));
    }

    #[test]
    fn duplicate_field_in_step_is_rejected() {
        let err = WizardController::new(vec![StepDefinition::new("a")
            .field(FieldRule::required("x"))
            .field(FieldRule::optional("x"))])
        .unwrap_err();
        assert!(matches!(err, WizardError::DuplicateField { .. }));
    }

    #[test]
    fn blank_identifiers_are_rejected() {
        assert!(matches!(
            WizardController::new(vec![StepDefinition::new(" ")]).unwrap_err(),
            WizardError::BlankStepId { index: 0 }
        ));
        assert!(matches!(
            WizardController::new(vec![StepDefinition::new("a").field(FieldRule::required(""))])
                .unwrap_err(),
            WizardError::BlankField { .. }
        ));
    }

    #[test]
    fn indices_follow_list_order() {
        let w = two_step();
        assert_eq!(w.steps()[0].index, 0);
        assert_eq!(w.steps()[1].index, 1);
    }

    // ── Navigation ───────────────────────────────────────────────────

    #[test]
    fn advance_blocked_leaves_index_and_records_errors() {
        let mut w = two_step();
        assert_eq!(
            w.advance(),
            NavigationOutcome::Invalid(ErrorKind::StepIncomplete)
        );
        assert_eq!(w.current_index(), 0);
        assert_eq!(w.error_for("email"), Some(&ErrorKind::Required));
        assert!(w.history().is_empty());
    }

    #[test]
    fn advance_on_last_step_is_noop() {
        let mut w = two_step();
        w.set_field("email", "a@b.com");
        assert_eq!(w.advance(), NavigationOutcome::Advanced);
        w.set_field("password", "Abcdefg1!");
        assert_eq!(w.advance(), NavigationOutcome::NoOp);
        assert_eq!(w.current_index(), 1);
    }

    #[test]
    fn advance_on_invalid_last_step_reports_incomplete() {
        let mut w = two_step();
        w.set_field("email", "a@b.com");
        w.advance();
        assert_eq!(
            w.advance(),
            NavigationOutcome::Invalid(ErrorKind::StepIncomplete)
        );
    }

    #[test]
    fn back_at_zero_is_noop() {
        let mut w = two_step();
        assert_eq!(w.back(), NavigationOutcome::NoOp);
        assert_eq!(w.current_index(), 0);
    }

    #[test]
    fn back_ignores_validation_state() {
        let mut w = two_step();
        w.set_field("email", "a@b.com");
        w.advance();
        // Current step is invalid (no password) yet back still works.
        assert!(!w.can_advance());
        assert_eq!(w.back(), NavigationOutcome::WentBack);
        assert_eq!(w.current_index(), 0);
    }

    #[test]
    fn history_records_each_move() {
        let mut w = two_step();
        w.set_field("email", "a@b.com");
        w.advance();
        w.back();
        let h = w.history();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].from_step.as_str(), "contact");
        assert_eq!(h[0].to_step.as_str(), "secret");
        assert_eq!(h[1].to_step.as_str(), "contact");
        assert!(h[0].timestamp <= h[1].timestamp);
    }

    // ── Error bookkeeping ────────────────────────────────────────────

    #[test]
    fn set_field_clears_only_that_error() {
        let mut w = WizardController::new(vec![StepDefinition::new("s")
            .field(FieldRule::required("a"))
            .field(FieldRule::required("b"))])
        .unwrap();
        w.validate_current_step();
        assert_eq!(w.state().field_errors().len(), 2);

        w.set_field("a", "");
        assert_eq!(w.error_for("a"), None);
        assert_eq!(w.error_for("b"), Some(&ErrorKind::Required));
    }

    #[test]
    fn revalidation_removes_fixed_errors() {
        let mut w = two_step();
        w.set_field("email", "bad");
        w.validate_current_step();
        assert_eq!(w.error_for("email"), Some(&ErrorKind::InvalidFormat));

        w.set_field("email", "ok@lot.io");
        let eval = w.validate_current_step();
        assert!(eval.is_step_valid);
        assert!(w.state().field_errors().is_empty());
    }

    #[test]
    fn errors_of_other_steps_survive_revalidation() {
        let mut w = two_step();
        w.set_field("email", "a@b.com");
        w.advance();
        w.advance(); // records password: Required
        w.back();
        w.validate_current_step();
        assert_eq!(w.error_for("password"), Some(&ErrorKind::Required));
    }

    // ── Snapshot & helpers ───────────────────────────────────────────

    #[test]
    fn snapshot_redacts_sensitive_fields() {
        let mut w = two_step();
        w.set_field("email", "a@b.com");
        w.set_field("password", "hunter22");
        let snap = w.snapshot();
        assert_eq!(snap.values.get("email").map(String::as_str), Some("a@b.com"));
        assert_eq!(snap.values.get("password").map(String::as_str), Some(REDACTED));
        assert!(snap.can_advance);
        assert!(snap.is_first_step);
        assert_eq!(snap.step_count, 2);
    }

    #[test]
    fn debug_output_never_contains_values() {
        let mut w = two_step();
        w.set_field("password", "hunter22");
        let debug = format!("{w:?}");
        assert!(debug.contains("password"));
        assert!(!debug.contains("hunter22"));
    }

    #[test]
    fn password_strength_tracks_current_value() {
        let mut w = two_step();
        assert_eq!(w.password_strength("password"), PasswordStrengthLevel::VeryWeak);
        w.set_field("password", "Abcdefg1!");
        assert_eq!(w.password_strength("password"), PasswordStrengthLevel::VeryStrong);
        w.set_field("password", "abc");
        assert_eq!(w.password_strength("password"), PasswordStrengthLevel::Weak);
    }

    #[test]
    fn first_invalid_step_scans_all_steps() {
        let mut w = two_step();
        assert_eq!(w.first_invalid_step(), Some(0));
        w.set_field("email", "a@b.com");
        assert_eq!(w.first_invalid_step(), Some(1));
        w.set_field("password", "Abcdefg1!");
        assert_eq!(w.first_invalid_step(), None);
        w.set_field("email", "broken");
        assert_eq!(w.first_invalid_step(), Some(0));
    }

    #[test]
    fn validate_step_merges_errors_of_another_step() {
        let mut w = two_step();
        w.set_field("email", "a@b.com");
        w.advance();
        w.set_field("email", "broken");

        let eval = w.validate_step(0).unwrap();
        assert!(!eval.is_step_valid);
        assert_eq!(w.current_index(), 1);
        assert_eq!(w.error_for("email"), Some(&ErrorKind::InvalidFormat));
        assert!(w.validate_step(2).is_none());

        w.set_field("email", "a@b.com");
        assert!(w.validate_step(0).unwrap().is_step_valid);
        assert!(w.error_for("email").is_none());
    }

    #[test]
    fn reset_returns_to_start() {
        let mut w = two_step();
        w.set_field("email", "a@b.com");
        w.advance();
        w.reset();
        assert_eq!(w.current_index(), 0);
        assert!(w.value("email").is_none());
        assert!(w.history().is_empty());
    }

    #[test]
    fn outcome_json_shape() {
        let json = serde_json::to_value(NavigationOutcome::Invalid(ErrorKind::StepIncomplete))
            .unwrap();
        assert_eq!(json["outcome"], "invalid");
        assert_eq!(json["reason"]["kind"], "step_incomplete");
    }
}
