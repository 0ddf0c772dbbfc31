//! Facility operator registration: account, facility, review.

use std::sync::Arc;

use async_trait::async_trait;

use parkwiz_action::AsyncActionCoordinator;
use parkwiz_core::{EngineConfig, ErrorKind};
use parkwiz_state::{StepDefinition, WizardController, WizardError};
use parkwiz_validation::{FieldRule, Rule};

use crate::backend::{AuthBackend, Credentials, RegistrationRequest};
use crate::fields::{
    ACCEPT_TERMS, CONFIRM_PASSWORD, EMAIL, FACILITY_ADDRESS, FACILITY_NAME, PASSWORD, TOTAL_SPACES,
};
use crate::flow::{coordinator, perform, Flow, FlowCore, FlowKind, IntentOutcome};

pub const STEP_ACCOUNT: &str = "account";
pub const STEP_FACILITY: &str = "facility";
pub const STEP_REVIEW: &str = "review";

/// Password rule shared by every page that sets a password.
pub(crate) fn new_password_rule(config: &EngineConfig) -> FieldRule {
    let rule = FieldRule::required(PASSWORD)
        .check(Rule::MinLength {
            min: config.password_min_length,
        })
        .sensitive();
    match config.min_password_strength {
        Some(level) => rule.check(Rule::MinStrength { level }),
        None => rule,
    }
}

pub(crate) fn confirm_password_rule() -> FieldRule {
    FieldRule::required(CONFIRM_PASSWORD)
        .check(Rule::Matches {
            field: PASSWORD.into(),
        })
        .sensitive()
}

pub fn steps(config: &EngineConfig) -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(STEP_ACCOUNT)
            .title("Account")
            .field(FieldRule::required(EMAIL).check(Rule::Email))
            .field(new_password_rule(config))
            .field(confirm_password_rule()),
        StepDefinition::new(STEP_FACILITY)
            .title("Facility")
            .field(FieldRule::required(FACILITY_NAME).check(Rule::NonEmpty))
            .field(FieldRule::optional(FACILITY_ADDRESS))
            .field(FieldRule::optional(TOTAL_SPACES).check(Rule::PositiveInteger)),
        StepDefinition::new(STEP_REVIEW)
            .title("Review")
            .field(FieldRule::required(ACCEPT_TERMS).check(Rule::Accepted)),
    ]
}

pub struct RegistrationFlow {
    core: FlowCore,
    backend: Arc<dyn AuthBackend>,
    submit: AsyncActionCoordinator,
}

impl RegistrationFlow {
    pub fn new(config: &EngineConfig, backend: Arc<dyn AuthBackend>) -> Result<Self, WizardError> {
        Ok(Self {
            core: FlowCore::new(WizardController::new(steps(config))?),
            backend,
            submit: coordinator(config),
        })
    }

    fn request(&self) -> RegistrationRequest {
        let address = self.core.text(FACILITY_ADDRESS);
        RegistrationRequest {
            credentials: Credentials::new(self.core.text(EMAIL), self.core.raw(PASSWORD)),
            facility_name: self.core.text(FACILITY_NAME),
            facility_address: (!address.is_empty()).then_some(address),
            total_spaces: self.core.text(TOTAL_SPACES).parse().ok(),
        }
    }
}

#[async_trait]
impl Flow for RegistrationFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Registration
    }

    fn core(&self) -> &FlowCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FlowCore {
        &mut self.core
    }

    fn actions(&self) -> Vec<(&'static str, &AsyncActionCoordinator)> {
        vec![("submit", &self.submit)]
    }

    fn password_field(&self) -> Option<&'static str> {
        Some(PASSWORD)
    }

    /// Register once every step validates. Only allowed from the review step.
    async fn submit(&mut self) -> IntentOutcome {
        if !self.core.wizard().is_last_step() {
            return IntentOutcome::Rejected {
                reason: ErrorKind::StepIncomplete,
            };
        }
        if let Err(outcome) = self.core.ready_to_submit() {
            return outcome;
        }

        let backend = Arc::clone(&self.backend);
        let request = self.request();
        let outcome = perform(&self.submit, "submit", "register", move || async move {
            backend.register(request).await
        })
        .await;
        self.sync();
        outcome
    }

    fn on_success(&mut self, _action: &'static str) {
        self.core.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::flow::{FlowPhase, Intent};
    use parkwiz_action::ActionStatus;
    use parkwiz_core::{FieldId, PasswordStrengthLevel, StepId};

    fn config() -> EngineConfig {
        EngineConfig {
            backend_latency_ms: 0,
            ..EngineConfig::default()
        }
    }

    async fn fill_account(flow: &mut RegistrationFlow) {
        for (field, value) in [
            (EMAIL, "ops@harbour.example"),
            (PASSWORD, "Abcdefg1!"),
            (CONFIRM_PASSWORD, "Abcdefg1!"),
        ] {
            flow.dispatch(Intent::SetField {
                field: field.into(),
                value: value.into(),
            })
            .await;
        }
    }

    #[test]
    fn step_list_is_well_formed() {
        assert!(WizardController::new(steps(&config())).is_ok());
    }

    #[test]
    fn min_strength_is_added_when_configured() {
        let strict = EngineConfig {
            min_password_strength: Some(PasswordStrengthLevel::Strong),
            ..config()
        };
        assert_eq!(new_password_rule(&strict).checks.len(), 2);
        assert_eq!(new_password_rule(&config()).checks.len(), 1);
    }

    #[tokio::test]
    async fn submit_before_review_is_rejected() {
        let backend = Arc::new(InMemoryBackend::default());
        let mut flow = RegistrationFlow::new(&config(), backend.clone()).unwrap();
        fill_account(&mut flow).await;
        assert_eq!(
            flow.dispatch(Intent::Submit).await,
            IntentOutcome::Rejected {
                reason: ErrorKind::StepIncomplete
            }
        );
        assert_eq!(backend.account_count(), 0);
        assert_eq!(flow.submit.status(), ActionStatus::Idle);
    }

    #[tokio::test]
    async fn submit_names_the_earlier_step_that_broke() {
        let backend = Arc::new(InMemoryBackend::default());
        let mut flow = RegistrationFlow::new(&config(), backend.clone()).unwrap();
        fill_account(&mut flow).await;
        flow.dispatch(Intent::Advance).await;
        flow.core.wizard_mut().set_field(FACILITY_NAME, "Harbour Garage");
        flow.dispatch(Intent::Advance).await;
        flow.core.wizard_mut().set_field(ACCEPT_TERMS, "true");
        flow.core.wizard_mut().set_field(EMAIL, "ops@harbour");

        assert_eq!(
            flow.dispatch(Intent::Submit).await,
            IntentOutcome::Blocked {
                step: StepId::new(STEP_ACCOUNT),
                step_index: 0,
                errors: [(FieldId::new(EMAIL), ErrorKind::InvalidFormat)]
                    .into_iter()
                    .collect(),
            }
        );
        assert_eq!(
            flow.wizard().error_for(EMAIL),
            Some(&ErrorKind::InvalidFormat)
        );
        assert_eq!(flow.wizard().current_step().id.as_str(), STEP_REVIEW);
        assert_eq!(backend.account_count(), 0);
    }

    #[tokio::test]
    async fn request_carries_optional_facility_details() {
        let backend = Arc::new(InMemoryBackend::default());
        let mut flow = RegistrationFlow::new(&config(), backend).unwrap();
        flow.core.wizard_mut().set_field(FACILITY_NAME, " Harbour Garage ");
        flow.core.wizard_mut().set_field(TOTAL_SPACES, "120");
        flow.core.wizard_mut().set_field(FACILITY_ADDRESS, "   ");
        let request = flow.request();
        assert_eq!(request.facility_name, "Harbour Garage");
        assert_eq!(request.total_spaces, Some(120));
        assert_eq!(request.facility_address, None);
    }

    #[tokio::test]
    async fn invalid_total_spaces_blocks_facility_step() {
        let backend = Arc::new(InMemoryBackend::default());
        let mut flow = RegistrationFlow::new(&config(), backend).unwrap();
        fill_account(&mut flow).await;
        flow.dispatch(Intent::Advance).await;
        flow.core.wizard_mut().set_field(FACILITY_NAME, "Harbour Garage");
        flow.core.wizard_mut().set_field(TOTAL_SPACES, "0");
        assert_eq!(
            flow.dispatch(Intent::Validate).await,
            IntentOutcome::Validation {
                is_step_valid: false,
                errors: [(FieldId::new(TOTAL_SPACES), ErrorKind::InvalidFormat)]
                    .into_iter()
                    .collect(),
            }
        );
        assert_eq!(flow.phase(), FlowPhase::InProgress);
    }
}
