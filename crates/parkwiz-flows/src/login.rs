//! Operator sign-in.

use std::sync::Arc;

use async_trait::async_trait;

use parkwiz_action::AsyncActionCoordinator;
use parkwiz_core::EngineConfig;
use parkwiz_state::{StepDefinition, WizardController, WizardError};
use parkwiz_validation::{FieldRule, Rule};

use crate::backend::{AuthBackend, Credentials};
use crate::fields::{EMAIL, PASSWORD, REMEMBER_ME};
use crate::flow::{coordinator, perform, Flow, FlowCore, FlowKind, IntentOutcome};

pub const STEP_CREDENTIALS: &str = "credentials";

/// Sign-in does not re-check password policy; the backend decides.
pub fn steps() -> Vec<StepDefinition> {
    vec![StepDefinition::new(STEP_CREDENTIALS)
        .title("Sign in")
        .field(FieldRule::required(EMAIL).check(Rule::Email))
        .field(FieldRule::required(PASSWORD).sensitive())
        .field(FieldRule::optional(REMEMBER_ME))]
}

pub struct LoginFlow {
    core: FlowCore,
    backend: Arc<dyn AuthBackend>,
    sign_in: AsyncActionCoordinator,
}

impl LoginFlow {
    pub fn new(config: &EngineConfig, backend: Arc<dyn AuthBackend>) -> Result<Self, WizardError> {
        Ok(Self {
            core: FlowCore::new(WizardController::new(steps())?),
            backend,
            sign_in: coordinator(config),
        })
    }

    /// Whether the operator asked to stay signed in.
    pub fn remember_me(&self) -> bool {
        self.core.text(REMEMBER_ME).eq_ignore_ascii_case("true")
    }

    pub async fn sign_in(&mut self) -> IntentOutcome {
        if let Err(outcome) = self.core.ready_to_submit() {
            return outcome;
        }

        let backend = Arc::clone(&self.backend);
        let credentials = Credentials::new(self.core.text(EMAIL), self.core.raw(PASSWORD));
        let outcome = perform(&self.sign_in, "sign_in", "sign-in", move || async move {
            backend.sign_in(credentials).await
        })
        .await;
        self.sync();
        outcome
    }
}

#[async_trait]
impl Flow for LoginFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Login
    }

    fn core(&self) -> &FlowCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FlowCore {
        &mut self.core
    }

    fn actions(&self) -> Vec<(&'static str, &AsyncActionCoordinator)> {
        vec![("sign_in", &self.sign_in)]
    }

    async fn submit(&mut self) -> IntentOutcome {
        self.sign_in().await
    }

    fn on_success(&mut self, _action: &'static str) {
        tracing::debug!(flow = %self.core.id(), remember_me = self.remember_me(), "signed in");
        self.core.complete();
    }
}
