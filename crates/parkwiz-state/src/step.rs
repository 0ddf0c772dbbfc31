//! Step definitions and structural errors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use parkwiz_core::StepId;
use parkwiz_validation::{evaluate, FieldRule, StepEvaluation};

use crate::wizard::WizardState;

/// One screen's worth of fields. Immutable once a wizard is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Position in the wizard, assigned at construction.
    #[serde(default)]
    pub index: usize,
    pub id: StepId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rules: Vec<FieldRule>,
}

impl StepDefinition {
    pub fn new(id: impl Into<StepId>) -> Self {
        Self {
            index: 0,
            id: id.into(),
            title: None,
            rules: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a field rule.
    pub fn field(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Run every rule of this step against the wizard's current values.
    pub fn evaluate(&self, state: &WizardState) -> StepEvaluation {
        evaluate(&self.rules, state.field_values())
    }

    pub(crate) fn check_structure(&self) -> Result<(), WizardError> {
        if self.id.is_blank() {
            return Err(WizardError::BlankStepId { index: self.index });
        }
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.field.is_blank() {
                return Err(WizardError::BlankField {
                    step: self.id.to_string(),
                });
            }
            if !seen.insert(rule.field.as_str()) {
                return Err(WizardError::DuplicateField {
                    step: self.id.to_string(),
                    field: rule.field.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Errors raised while constructing a wizard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// A wizard needs at least one step.
    #[error("wizard must have at least one step")]
    NoSteps,

    #[error("step at index {index} has a blank identifier")]
    BlankStepId { index: usize },

    #[error("duplicate step identifier: {id}")]
    DuplicateStep { id: String },

    #[error("step {step} has a rule with a blank field name")]
    BlankField { step: String },

    /// Combine the checks into one `FieldRule` instead.
    #[error("step {step} lists field {field} more than once")]
    DuplicateField { step: String, field: String },
}
