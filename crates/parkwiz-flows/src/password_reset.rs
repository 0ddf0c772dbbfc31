//! Password reset: request a link, wait for it, choose a new password.
//!
//! ```text
//! request ──send_link──▶ sent ──advance──▶ new-password ──finalize──▶ Completed
//!                         │
//!                         └── resend (rate limited by the resend cooldown)
//! ```
//!
//! Sending and resending use separate coordinators so a resend never shows
//! up as the primary action's spinner. A successful send or resend starts
//! the resend cooldown; while it runs, neither may fire again.

use std::sync::Arc;

use async_trait::async_trait;

use parkwiz_action::AsyncActionCoordinator;
use parkwiz_core::{EngineConfig, ErrorKind};
use parkwiz_state::{NavigationOutcome, StepDefinition, WizardController, WizardError};
use parkwiz_validation::{FieldRule, Rule};

use crate::backend::{AuthBackend, Credentials};
use crate::fields::{EMAIL, PASSWORD};
use crate::flow::{coordinator, perform, Flow, FlowCore, FlowKind, IntentOutcome};
use crate::registration::{confirm_password_rule, new_password_rule};

pub const STEP_REQUEST: &str = "request";
pub const STEP_SENT: &str = "sent";
pub const STEP_NEW_PASSWORD: &str = "new-password";

pub fn steps(config: &EngineConfig) -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(STEP_REQUEST)
            .title("Reset password")
            .field(FieldRule::required(EMAIL).check(Rule::Email)),
        StepDefinition::new(STEP_SENT).title("Check your email"),
        StepDefinition::new(STEP_NEW_PASSWORD)
            .title("Choose a new password")
            .field(new_password_rule(config))
            .field(confirm_password_rule()),
    ]
}

pub struct PasswordResetFlow {
    core: FlowCore,
    backend: Arc<dyn AuthBackend>,
    cooldown_secs: u32,
    send_link: AsyncActionCoordinator,
    resend: AsyncActionCoordinator,
    finalize: AsyncActionCoordinator,
    /// Normalized address of the latest `send_link` run.
    link_requested_for: Option<String>,
    /// Normalized address the last link went to.
    link_sent_to: Option<String>,
}

impl PasswordResetFlow {
    pub fn new(config: &EngineConfig, backend: Arc<dyn AuthBackend>) -> Result<Self, WizardError> {
        Ok(Self {
            core: FlowCore::new(WizardController::new(steps(config))?),
            backend,
            cooldown_secs: config.resend_cooldown_secs,
            send_link: coordinator(config),
            resend: coordinator(config),
            finalize: coordinator(config),
            link_requested_for: None,
            link_sent_to: None,
        })
    }

    pub fn link_sent_to(&self) -> Option<&str> {
        self.link_sent_to.as_deref()
    }

    fn current_step(&self) -> &str {
        self.core.wizard().current_step().id.as_str()
    }

    /// Whether a link went to the address currently in the email field.
    fn link_matches_email(&self) -> bool {
        self.link_sent_to.as_deref() == Some(self.core.text(EMAIL).to_lowercase().as_str())
    }

    fn start_cooldown(&self) {
        if let Err(error) = self.resend.start_cooldown(self.cooldown_secs) {
            tracing::warn!(flow = %self.core.id(), error = %error, "resend cooldown not started");
        }
    }

    /// Request a reset link for the entered email. On success move to the
    /// `sent` step and start the resend cooldown.
    pub async fn send_link(&mut self) -> IntentOutcome {
        if self.current_step() != STEP_REQUEST {
            return IntentOutcome::Unsupported;
        }
        let eval = self.core.wizard_mut().validate_current_step();
        if !eval.is_step_valid {
            return IntentOutcome::Rejected {
                reason: ErrorKind::StepIncomplete,
            };
        }
        let remaining_secs = self.resend.snapshot().cooldown_remaining_secs;
        if remaining_secs > 0 {
            return IntentOutcome::Rejected {
                reason: ErrorKind::CoolingDown { remaining_secs },
            };
        }

        let email = self.core.text(EMAIL).to_lowercase();
        let backend = Arc::clone(&self.backend);
        self.link_requested_for = Some(email.clone());
        let outcome = perform(&self.send_link, "send_link", "send-reset-link", move || {
            async move { backend.send_reset_link(email).await }
        })
        .await;
        self.sync();
        outcome
    }

    /// Send the link again. Only available on the `sent` step.
    pub async fn resend_link(&mut self) -> IntentOutcome {
        if self.current_step() != STEP_SENT {
            return IntentOutcome::Unsupported;
        }
        let Some(email) = self.link_sent_to.clone() else {
            return IntentOutcome::Unsupported;
        };

        let backend = Arc::clone(&self.backend);
        let outcome = perform(&self.resend, "resend", "resend-reset-link", move || async move {
            backend.send_reset_link(email).await
        })
        .await;
        self.sync();
        outcome
    }

    /// Store the new password and complete the flow.
    pub async fn finalize(&mut self) -> IntentOutcome {
        if self.current_step() != STEP_NEW_PASSWORD {
            return IntentOutcome::Unsupported;
        }
        if let Err(outcome) = self.core.ready_to_submit() {
            return outcome;
        }
        let Some(email) = self.link_sent_to.clone() else {
            return IntentOutcome::Rejected {
                reason: ErrorKind::StepIncomplete,
            };
        };

        let backend = Arc::clone(&self.backend);
        let credentials = Credentials::new(email, self.core.raw(PASSWORD));
        let outcome = perform(&self.finalize, "finalize", "reset-password", move || {
            async move { backend.reset_password(credentials).await }
        })
        .await;
        self.sync();
        outcome
    }
}

#[async_trait]
impl Flow for PasswordResetFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::PasswordReset
    }

    fn core(&self) -> &FlowCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FlowCore {
        &mut self.core
    }

    fn actions(&self) -> Vec<(&'static str, &AsyncActionCoordinator)> {
        vec![
            ("send_link", &self.send_link),
            ("resend", &self.resend),
            ("finalize", &self.finalize),
        ]
    }

    fn password_field(&self) -> Option<&'static str> {
        Some(PASSWORD)
    }

    /// The primary action of whichever step is showing.
    async fn submit(&mut self) -> IntentOutcome {
        let step = self.current_step().to_string();
        match step.as_str() {
            STEP_REQUEST => self.send_link().await,
            STEP_SENT => self.advance().await,
            _ => self.finalize().await,
        }
    }

    async fn resend(&mut self) -> IntentOutcome {
        self.resend_link().await
    }

    /// A sent link moves to `sent` and starts the resend cooldown, measured
    /// from when the outcome is applied. Finishing the reset stops it.
    fn on_success(&mut self, action: &'static str) {
        match action {
            "send_link" => {
                self.link_sent_to = self.link_requested_for.clone();
                if self.current_step() == STEP_REQUEST
                    && !self.core.wizard_mut().advance().moved()
                {
                    tracing::warn!(flow = %self.core.id(), "link sent but request step no longer validates");
                }
                self.start_cooldown();
            }
            "resend" => self.start_cooldown(),
            "finalize" => {
                self.resend.cancel_cooldown();
                self.core.complete();
            }
            _ => {}
        }
    }

    /// Leaving the request step requires a link sent to the entered address.
    /// An invalid email reports `StepIncomplete`; a valid one with no link
    /// reports `LinkNotSent`.
    async fn advance(&mut self) -> IntentOutcome {
        if self.current_step() == STEP_REQUEST && !self.link_matches_email() {
            let eval = self.core.wizard_mut().validate_current_step();
            let reason = if eval.is_step_valid {
                ErrorKind::LinkNotSent
            } else {
                ErrorKind::StepIncomplete
            };
            return IntentOutcome::Navigation {
                result: NavigationOutcome::Invalid(reason),
            };
        }
        IntentOutcome::Navigation {
            result: self.core.wizard_mut().advance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::fields::CONFIRM_PASSWORD;
    use crate::flow::{FlowPhase, Intent};
    use parkwiz_action::ActionStatus;

    const EMAIL_ADDR: &str = "ops@harbour.example";

    fn config() -> EngineConfig {
        EngineConfig {
            resend_cooldown_secs: 60,
            ..EngineConfig::default()
        }
    }

    fn backend() -> Arc<InMemoryBackend> {
        Arc::new(InMemoryBackend::default().with_account(EMAIL_ADDR, "Old-pass1"))
    }

    async fn set(flow: &mut PasswordResetFlow, field: &str, value: &str) {
        flow.dispatch(Intent::SetField {
            field: field.into(),
            value: value.into(),
        })
        .await;
    }

    fn resend_cooldown(flow: &mut PasswordResetFlow) -> u32 {
        flow.snapshot().actions["resend"].cooldown_remaining_secs
    }

    #[tokio::test(start_paused = true)]
    async fn send_link_advances_and_starts_cooldown() {
        let backend = backend();
        let mut flow = PasswordResetFlow::new(&config(), backend.clone()).unwrap();
        set(&mut flow, EMAIL, "Ops@Harbour.example").await;

        let outcome = flow.dispatch(Intent::Submit).await;
        assert_eq!(
            outcome,
            IntentOutcome::Action {
                action: "send_link".into(),
                status: ActionStatus::Succeeded,
            }
        );
        assert_eq!(flow.current_step(), STEP_SENT);
        assert_eq!(flow.link_sent_to(), Some(EMAIL_ADDR));
        assert_eq!(resend_cooldown(&mut flow), 60);
        assert_eq!(backend.sent_links().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resend_is_rate_limited() {
        let backend = backend();
        let mut flow = PasswordResetFlow::new(&config(), backend.clone()).unwrap();
        set(&mut flow, EMAIL, EMAIL_ADDR).await;
        flow.dispatch(Intent::Submit).await;

        assert!(matches!(
            flow.dispatch(Intent::Resend).await,
            IntentOutcome::Rejected {
                reason: ErrorKind::CoolingDown { .. }
            }
        ));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(resend_cooldown(&mut flow), 0);
        assert_eq!(
            flow.dispatch(Intent::Resend).await,
            IntentOutcome::Action {
                action: "resend".into(),
                status: ActionStatus::Succeeded,
            }
        );
        assert_eq!(resend_cooldown(&mut flow), 60);
        assert_eq!(backend.sent_links().len(), 2);
    }

    #[tokio::test]
    async fn unknown_email_stays_on_request_step() {
        let mut flow = PasswordResetFlow::new(&config(), backend()).unwrap();
        set(&mut flow, EMAIL, "nobody@harbour.example").await;
        assert_eq!(
            flow.dispatch(Intent::Submit).await,
            IntentOutcome::Action {
                action: "send_link".into(),
                status: ActionStatus::Failed(ErrorKind::NotFound),
            }
        );
        assert_eq!(flow.current_step(), STEP_REQUEST);
        assert_eq!(resend_cooldown(&mut flow), 0);
    }

    #[tokio::test]
    async fn advance_without_link_is_blocked() {
        let mut flow = PasswordResetFlow::new(&config(), backend()).unwrap();
        set(&mut flow, EMAIL, "not-an-email").await;
        assert_eq!(
            flow.dispatch(Intent::Advance).await,
            IntentOutcome::Navigation {
                result: NavigationOutcome::Invalid(ErrorKind::StepIncomplete)
            }
        );
        assert_eq!(flow.wizard().error_for(EMAIL), Some(&ErrorKind::InvalidFormat));

        set(&mut flow, EMAIL, EMAIL_ADDR).await;
        assert_eq!(
            flow.dispatch(Intent::Advance).await,
            IntentOutcome::Navigation {
                result: NavigationOutcome::Invalid(ErrorKind::LinkNotSent)
            }
        );
        assert!(flow.wizard().error_for(EMAIL).is_none());
        assert_eq!(flow.current_step(), STEP_REQUEST);
    }

    #[tokio::test]
    async fn resend_outside_sent_step_is_unsupported() {
        let mut flow = PasswordResetFlow::new(&config(), backend()).unwrap();
        assert_eq!(
            flow.dispatch(Intent::Resend).await,
            IntentOutcome::Unsupported
        );
    }

    #[tokio::test(start_paused = true)]
    async fn full_reset_completes_and_stops_countdown() {
        let backend = backend();
        let mut flow = PasswordResetFlow::new(&config(), backend.clone()).unwrap();
        set(&mut flow, EMAIL, EMAIL_ADDR).await;
        flow.dispatch(Intent::Submit).await;
        assert_eq!(
            flow.dispatch(Intent::Submit).await,
            IntentOutcome::Navigation {
                result: NavigationOutcome::Advanced
            }
        );
        assert_eq!(flow.current_step(), STEP_NEW_PASSWORD);

        set(&mut flow, PASSWORD, "New-pass1").await;
        set(&mut flow, CONFIRM_PASSWORD, "New-pass2").await;
        assert_eq!(
            flow.dispatch(Intent::Submit).await,
            IntentOutcome::Rejected {
                reason: ErrorKind::StepIncomplete
            }
        );
        assert_eq!(
            flow.wizard().error_for(CONFIRM_PASSWORD),
            Some(&ErrorKind::Mismatch)
        );

        set(&mut flow, CONFIRM_PASSWORD, "New-pass1").await;
        assert_eq!(
            flow.dispatch(Intent::Submit).await,
            IntentOutcome::Action {
                action: "finalize".into(),
                status: ActionStatus::Succeeded,
            }
        );
        assert_eq!(flow.phase(), FlowPhase::Completed);
        assert_eq!(resend_cooldown(&mut flow), 0);
        assert!(backend
            .sign_in(Credentials::new(EMAIL_ADDR, "New-pass1"))
            .await
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn going_back_to_change_email_requires_new_link() {
        let mut flow = PasswordResetFlow::new(&config(), backend()).unwrap();
        set(&mut flow, EMAIL, EMAIL_ADDR).await;
        flow.dispatch(Intent::Submit).await;
        flow.dispatch(Intent::Back).await;
        set(&mut flow, EMAIL, "other@harbour.example").await;

        assert_eq!(
            flow.dispatch(Intent::Advance).await,
            IntentOutcome::Navigation {
                result: NavigationOutcome::Invalid(ErrorKind::LinkNotSent)
            }
        );
        assert_eq!(
            flow.dispatch(Intent::Submit).await,
            IntentOutcome::Rejected {
                reason: ErrorKind::CoolingDown { remaining_secs: 60 }
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_countdown_and_refuses_intents() {
        let mut flow = PasswordResetFlow::new(&config(), backend()).unwrap();
        set(&mut flow, EMAIL, EMAIL_ADDR).await;
        flow.dispatch(Intent::Submit).await;
        assert_eq!(resend_cooldown(&mut flow), 60);

        flow.teardown();
        assert_eq!(flow.phase(), FlowPhase::TornDown);
        assert_eq!(resend_cooldown(&mut flow), 0);
        assert_eq!(flow.dispatch(Intent::Resend).await, IntentOutcome::TornDown);
    }
}
