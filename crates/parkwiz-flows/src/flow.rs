//! # Flow Host
//!
//! A flow is one page of the dashboard: a [`WizardController`] plus one
//! [`AsyncActionCoordinator`] per logical action on that page. Hosts drive
//! it through [`Intent`]s and render [`FlowSnapshot`]s.
//!
//! ## Phases
//!
//! ```text
//! InProgress ──(action succeeds)──▶ Completed
//!      │                                │
//!      └──────────── teardown ──────────┴──▶ TornDown
//! ```
//!
//! Once `Completed`, further intents answer `AlreadyCompleted`; once
//! `TornDown`, they answer `TornDown` and no coordinator accepts work.
//!
//! ## Settled runs
//!
//! Coordinators settle on their own tasks, so a run outlives a `dispatch`
//! future the host dropped. Pages never react to an outcome inline:
//! [`Flow::sync`] applies every run that settled since it last looked,
//! exactly once, and runs at the start of `dispatch`, after each action,
//! and in `snapshot`.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use parkwiz_action::{ActionStatus, AsyncActionCoordinator, AsyncOperationState};
use parkwiz_core::{
    EngineConfig, ErrorKind, FieldId, FlowId, OperationId, PasswordStrengthLevel, StepId,
};
use parkwiz_state::{NavigationOutcome, WizardController, WizardError, WizardSnapshot};

use crate::backend::AuthBackend;
use crate::login::LoginFlow;
use crate::password_reset::PasswordResetFlow;
use crate::registration::RegistrationFlow;

// ─── Kinds & phases ──────────────────────────────────────────────────

/// The pages the engine knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Registration,
    Login,
    PasswordReset,
}

impl FlowKind {
    pub const ALL: [FlowKind; 3] = [Self::Registration, Self::Login, Self::PasswordReset];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Login => "login",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| FlowError::UnknownFlow(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    #[default]
    InProgress,
    Completed,
    TornDown,
}

/// Errors raised while building a flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("unknown flow: {0}")]
    UnknownFlow(String),

    /// The page's step list is malformed.
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

// ─── Intents & outcomes ──────────────────────────────────────────────

/// Something the user did on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    SetField { field: FieldId, value: String },
    Advance,
    Back,
    Validate,
    Submit,
    Resend,
    /// Abort in-flight work on every action. Cooldowns keep running.
    Cancel,
}

impl Intent {
    /// Intent name without its payload; safe to log.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetField { .. } => "set_field",
            Self::Advance => "advance",
            Self::Back => "back",
            Self::Validate => "validate",
            Self::Submit => "submit",
            Self::Resend => "resend",
            Self::Cancel => "cancel",
        }
    }
}

/// What a dispatched intent did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentOutcome {
    FieldSet {
        field: FieldId,
    },
    Navigation {
        result: NavigationOutcome,
    },
    Validation {
        is_step_valid: bool,
        errors: BTreeMap<FieldId, ErrorKind>,
    },
    /// An action ran to completion (or was cancelled, reported as `Idle`).
    Action {
        action: String,
        status: ActionStatus,
    },
    /// The intent was refused before any work started.
    Rejected {
        reason: ErrorKind,
    },
    /// Submit refused because an earlier step no longer validates. Its
    /// errors are also merged into the wizard state.
    Blocked {
        step: StepId,
        step_index: usize,
        errors: BTreeMap<FieldId, ErrorKind>,
    },
    Cancelled,
    AlreadyCompleted,
    /// The page has no such action at its current step.
    Unsupported,
    TornDown,
}

/// Everything a host needs to render a flow.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub flow_id: FlowId,
    pub kind: FlowKind,
    pub phase: FlowPhase,
    pub wizard: WizardSnapshot,
    /// Strength of the page's password field, if it has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_strength: Option<PasswordStrengthLevel>,
    pub actions: BTreeMap<String, AsyncOperationState>,
}

// ─── Shared page state ───────────────────────────────────────────────

/// State every flow carries besides its coordinators.
#[derive(Debug)]
pub struct FlowCore {
    id: FlowId,
    wizard: WizardController,
    phase: FlowPhase,
    /// Highest settled `run_seq` already applied, per action.
    applied: BTreeMap<&'static str, u64>,
}

impl FlowCore {
    pub fn new(wizard: WizardController) -> Self {
        Self {
            id: FlowId::new(),
            wizard,
            phase: FlowPhase::InProgress,
            applied: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn wizard(&self) -> &WizardController {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut WizardController {
        &mut self.wizard
    }

    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    pub(crate) fn complete(&mut self) {
        tracing::info!(flow = %self.id, "flow completed");
        self.phase = FlowPhase::Completed;
    }

    /// Trimmed value of `field`, empty if unset.
    pub(crate) fn text(&self, field: &str) -> String {
        self.wizard.value(field).unwrap_or_default().trim().to_string()
    }

    /// Raw value of `field`, empty if unset. Used for passwords.
    pub(crate) fn raw(&self, field: &str) -> String {
        self.wizard.value(field).unwrap_or_default().to_string()
    }

    /// Validate the current step and then every other step.
    ///
    /// A failing current step rejects with `StepIncomplete`. A failing
    /// other step answers `Blocked` naming it. Either way the failing
    /// step's errors are merged into state.
    pub(crate) fn ready_to_submit(&mut self) -> Result<(), IntentOutcome> {
        let eval = self.wizard.validate_current_step();
        if !eval.is_step_valid {
            return Err(IntentOutcome::Rejected {
                reason: ErrorKind::StepIncomplete,
            });
        }
        let Some(index) = self.wizard.first_invalid_step() else {
            return Ok(());
        };
        let step = self.wizard.steps()[index].id.clone();
        let errors = self
            .wizard
            .validate_step(index)
            .map(|eval| eval.errors)
            .unwrap_or_default();
        tracing::debug!(flow = %self.id, step = %step, failing = errors.len(), "submit blocked by earlier step");
        Err(IntentOutcome::Blocked {
            step,
            step_index: index,
            errors,
        })
    }

    /// Mark the run in `state` as seen. True only the first time a given
    /// settled run of `action` is offered.
    fn take_settled(&mut self, action: &'static str, state: &AsyncOperationState) -> bool {
        let seen = self.applied.entry(action).or_default();
        if !state.status.is_settled() || state.run_seq <= *seen {
            return false;
        }
        *seen = state.run_seq;
        true
    }
}

/// Build a coordinator honouring the configured deadline.
pub(crate) fn coordinator(config: &EngineConfig) -> AsyncActionCoordinator {
    let coordinator = AsyncActionCoordinator::new();
    match config.action_timeout_secs {
        Some(secs) => coordinator.with_timeout(Duration::from_secs(secs)),
        None => coordinator,
    }
}

/// Run `work` on `coordinator` and wait for it to settle.
pub(crate) async fn perform<F, Fut>(
    coordinator: &AsyncActionCoordinator,
    action: &str,
    operation: impl Into<OperationId>,
    work: F,
) -> IntentOutcome
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), ErrorKind>> + Send + 'static,
{
    match coordinator.run_and_wait(operation, work).await {
        Ok(status) => IntentOutcome::Action {
            action: action.to_string(),
            status,
        },
        Err(reason) => IntentOutcome::Rejected { reason },
    }
}

// ─── Flow trait ──────────────────────────────────────────────────────

/// One page, driven by intents.
///
/// Implementors supply their state, coordinators, and the page-specific
/// `submit`; navigation, validation, snapshots, and teardown are shared.
#[async_trait]
pub trait Flow: Send {
    fn kind(&self) -> FlowKind;

    fn core(&self) -> &FlowCore;

    fn core_mut(&mut self) -> &mut FlowCore;

    /// Every coordinator of the page, keyed by action name.
    fn actions(&self) -> Vec<(&'static str, &AsyncActionCoordinator)>;

    /// The field whose strength meter the page shows, if any.
    fn password_field(&self) -> Option<&'static str> {
        None
    }

    /// The page's primary action.
    async fn submit(&mut self) -> IntentOutcome;

    /// React to a run of `action` that settled as `Succeeded`. Called once
    /// per run, by [`Flow::sync`], while the flow is in progress.
    fn on_success(&mut self, action: &'static str);

    async fn resend(&mut self) -> IntentOutcome {
        IntentOutcome::Unsupported
    }

    async fn advance(&mut self) -> IntentOutcome {
        IntentOutcome::Navigation {
            result: self.core_mut().wizard_mut().advance(),
        }
    }

    fn id(&self) -> FlowId {
        self.core().id()
    }

    fn wizard(&self) -> &WizardController {
        self.core().wizard()
    }

    fn phase(&self) -> FlowPhase {
        self.core().phase()
    }

    /// Apply every run that settled since the last call, including runs
    /// whose `dispatch` was dropped before they finished.
    fn sync(&mut self) {
        let states: Vec<(&'static str, AsyncOperationState)> = self
            .actions()
            .into_iter()
            .map(|(name, coordinator)| (name, coordinator.snapshot()))
            .collect();
        for (action, state) in states {
            if !self.core_mut().take_settled(action, &state) {
                continue;
            }
            if state.status == ActionStatus::Succeeded && self.phase() == FlowPhase::InProgress {
                tracing::debug!(flow = %self.id(), action, run_seq = state.run_seq, "applying settled run");
                self.on_success(action);
            }
        }
    }

    /// Apply one intent.
    async fn dispatch(&mut self, intent: Intent) -> IntentOutcome {
        self.sync();
        match self.phase() {
            FlowPhase::TornDown => return IntentOutcome::TornDown,
            FlowPhase::Completed => return IntentOutcome::AlreadyCompleted,
            FlowPhase::InProgress => {}
        }
        tracing::debug!(flow = %self.id(), kind = %self.kind(), intent = intent.name(), "dispatch");
        match intent {
            Intent::SetField { field, value } => {
                self.core_mut().wizard_mut().set_field(field.clone(), value);
                IntentOutcome::FieldSet { field }
            }
            Intent::Advance => self.advance().await,
            Intent::Back => IntentOutcome::Navigation {
                result: self.core_mut().wizard_mut().back(),
            },
            Intent::Validate => {
                let eval = self.core_mut().wizard_mut().validate_current_step();
                IntentOutcome::Validation {
                    is_step_valid: eval.is_step_valid,
                    errors: eval.errors,
                }
            }
            Intent::Submit => self.submit().await,
            Intent::Resend => self.resend().await,
            Intent::Cancel => {
                for (_, coordinator) in self.actions() {
                    coordinator.cancel_work();
                }
                IntentOutcome::Cancelled
            }
        }
    }

    /// Current view of the page, after applying settled runs.
    fn snapshot(&mut self) -> FlowSnapshot {
        self.sync();
        let wizard = self.wizard();
        FlowSnapshot {
            flow_id: self.id(),
            kind: self.kind(),
            phase: self.phase(),
            wizard: wizard.snapshot(),
            password_strength: self
                .password_field()
                .map(|field| wizard.password_strength(field)),
            actions: self
                .actions()
                .into_iter()
                .map(|(name, coordinator)| (name.to_string(), coordinator.snapshot()))
                .collect(),
        }
    }

    /// Cancel every coordinator and refuse further intents. Results of
    /// in-flight work are discarded.
    fn teardown(&mut self) {
        for (_, coordinator) in self.actions() {
            coordinator.cancel();
        }
        let core = self.core_mut();
        if core.phase != FlowPhase::TornDown {
            tracing::debug!(flow = %core.id, "flow torn down");
            core.phase = FlowPhase::TornDown;
        }
    }
}

/// Build the flow for `kind` against `backend`.
pub fn build_flow(
    kind: FlowKind,
    config: &EngineConfig,
    backend: Arc<dyn AuthBackend>,
) -> Result<Box<dyn Flow>, FlowError> {
    tracing::debug!(flow = %kind, backend = backend.backend_name(), "building flow");
    let flow: Box<dyn Flow> = match kind {
        FlowKind::Registration => Box::new(RegistrationFlow::new(config, backend)?),
        FlowKind::Login => Box::new(LoginFlow::new(config, backend)?),
        FlowKind::PasswordReset => Box::new(PasswordResetFlow::new(config, backend)?),
    };
    Ok(flow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_loosely() {
        assert_eq!("login".parse::<FlowKind>().unwrap(), FlowKind::Login);
        assert_eq!(
            "Password-Reset".parse::<FlowKind>().unwrap(),
            FlowKind::PasswordReset
        );
        assert_eq!(
            "checkout".parse::<FlowKind>(),
            Err(FlowError::UnknownFlow("checkout".into()))
        );
    }

    #[test]
    fn intent_yaml_shape() {
        let intents: Vec<Intent> = serde_yaml::from_str(
            "- intent: set_field\n  field: email\n  value: a@b.com\n- intent: advance\n- intent: submit\n",
        )
        .unwrap();
        assert_eq!(
            intents,
            vec![
                Intent::SetField {
                    field: FieldId::new("email"),
                    value: "a@b.com".into()
                },
                Intent::Advance,
                Intent::Submit,
            ]
        );
    }

    #[test]
    fn outcome_json_shape() {
        let json = serde_json::to_value(IntentOutcome::Action {
            action: "submit".into(),
            status: ActionStatus::Failed(ErrorKind::AlreadyExists),
        })
        .unwrap();
        assert_eq!(json["type"], "action");
        assert_eq!(json["status"]["status"], "failed");
        assert_eq!(json["status"]["reason"]["kind"], "already_exists");

        let json = serde_json::to_value(IntentOutcome::Navigation {
            result: NavigationOutcome::Advanced,
        })
        .unwrap();
        assert_eq!(json["result"]["outcome"], "advanced");
    }

    #[test]
    fn coordinator_respects_disabled_timeout() {
        let config = EngineConfig {
            action_timeout_secs: None,
            ..EngineConfig::default()
        };
        assert!(coordinator(&config).is_available());
    }
}
