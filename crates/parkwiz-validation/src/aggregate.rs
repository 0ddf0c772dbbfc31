//! # Step Validation Aggregation
//!
//! Runs every [`FieldRule`] of one step and summarises the outcome. The
//! result is a fresh value; merging it into wizard state is the caller's
//! decision. Values for fields without a rule in the step are ignored.

use std::collections::BTreeMap;

use serde::Serialize;

use parkwiz_core::{ErrorKind, FieldId};

use crate::rule::{FieldRule, FieldValues, ValidationResult};

/// Per-field outcome of evaluating one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepEvaluation {
    /// Failing fields and why. Fields that passed are absent.
    pub errors: BTreeMap<FieldId, ErrorKind>,
    /// True iff every rule of the step returned `Valid`.
    pub is_step_valid: bool,
    /// Every field that was checked, passing or not.
    #[serde(skip)]
    checked: Vec<FieldId>,
}

impl StepEvaluation {
    /// Fields that were checked and passed.
    pub fn valid_fields(&self) -> impl Iterator<Item = &FieldId> {
        self.checked
            .iter()
            .filter(move |field| !self.errors.contains_key(field.as_str()))
    }

    /// Every field the step has a rule for.
    pub fn checked_fields(&self) -> &[FieldId] {
        &self.checked
    }

    /// Result for one field, or `None` if the step has no rule for it.
    pub fn result_for(&self, field: &str) -> Option<ValidationResult> {
        if !self.checked.iter().any(|f| f.as_str() == field) {
            return None;
        }
        Some(match self.errors.get(field) {
            Some(kind) => ValidationResult::Invalid(kind.clone()),
            None => ValidationResult::Valid,
        })
    }
}

/// Evaluate all `rules` of a step against the current `values`.
///
/// When a step lists the same field twice, the first failure is kept.
pub fn evaluate(rules: &[FieldRule], values: &FieldValues) -> StepEvaluation {
    let mut errors = BTreeMap::new();
    let mut checked: Vec<FieldId> = Vec::with_capacity(rules.len());

    for rule in rules {
        if !checked.contains(&rule.field) {
            checked.push(rule.field.clone());
        }
        if errors.contains_key(&rule.field) {
            continue;
        }
        if let ValidationResult::Invalid(kind) = rule.evaluate(values) {
            errors.insert(rule.field.clone(), kind);
        }
    }

    StepEvaluation {
        is_step_valid: errors.is_empty(),
        errors,
        checked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    fn account_rules() -> Vec<FieldRule> {
        vec![
            FieldRule::required("email").check(Rule::Email),
            FieldRule::required("password")
                .check(Rule::MinLength { min: 8 })
                .sensitive(),
            FieldRule::required("confirmPassword")
                .check(Rule::Matches {
                    field: FieldId::from("password"),
                })
                .sensitive(),
        ]
    }

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (FieldId::from(*k), v.to_string()))
            .collect()
    }

    #[test]
    fn all_valid() {
        let eval = evaluate(
            &account_rules(),
            &values(&[
                ("email", "x@y.com"),
                ("password", "Abc12345"),
                ("confirmPassword", "Abc12345"),
            ]),
        );
        assert!(eval.is_step_valid);
        assert!(eval.errors.is_empty());
        assert_eq!(eval.valid_fields().count(), 3);
    }

    #[test]
    fn missing_values_are_required_not_a_crash() {
        let eval = evaluate(&account_rules(), &FieldValues::new());
        assert!(!eval.is_step_valid);
        assert_eq!(eval.errors.len(), 3);
        assert!(eval.errors.values().all(|k| *k == ErrorKind::Required));
    }

    #[test]
    fn mixed_results() {
        let eval = evaluate(
            &account_rules(),
            &values(&[
                ("email", "a@b"),
                ("password", "Abc12345"),
                ("confirmPassword", "nope"),
            ]),
        );
        assert!(!eval.is_step_valid);
        assert_eq!(eval.errors.get("email"), Some(&ErrorKind::InvalidFormat));
        assert_eq!(eval.errors.get("confirmPassword"), Some(&ErrorKind::Mismatch));
        assert_eq!(eval.result_for("password"), Some(ValidationResult::Valid));
    }

    #[test]
    fn fields_without_rules_are_ignored() {
        let eval = evaluate(
            &[FieldRule::required("facilityName")],
            &values(&[("facilityName", "Lot 7"), ("email", "")]),
        );
        assert!(eval.is_step_valid);
        assert_eq!(eval.result_for("email"), None);
    }

    #[test]
    fn empty_step_is_valid() {
        let eval = evaluate(&[], &FieldValues::new());
        assert!(eval.is_step_valid);
    }

    #[test]
    fn duplicate_field_keeps_first_failure() {
        let rules = vec![
            FieldRule::required("code").check(Rule::MinLength { min: 6 }),
            FieldRule::required("code").check(Rule::PositiveInteger),
        ];
        let eval = evaluate(&rules, &values(&[("code", "abc")]));
        assert_eq!(eval.errors.get("code"), Some(&ErrorKind::TooShort { min: 6 }));
        assert_eq!(eval.checked_fields().len(), 1);
    }
}
