//! # parkwiz-flows — Dashboard Authentication Flows
//!
//! The registration, login and password-reset pages of the parking
//! dashboard, each expressed as a list of [`StepDefinition`]s driven by a
//! [`WizardController`] and one [`AsyncActionCoordinator`] per action.
//!
//! | Flow | Steps | Actions |
//! |------|-------|---------|
//! | [`RegistrationFlow`] | `account` → `facility` → `review` | `submit` |
//! | [`LoginFlow`] | `credentials` | `sign_in` |
//! | [`PasswordResetFlow`] | `request` → `sent` → `new-password` | `send_link`, `resend`, `finalize` |
//!
//! Network I/O goes through the [`AuthBackend`] trait. [`InMemoryBackend`]
//! is a deterministic implementation with configurable latency and
//! injectable failures, used by tests and the CLI.
//!
//! [`StepDefinition`]: parkwiz_state::StepDefinition
//! [`WizardController`]: parkwiz_state::WizardController
//! [`AsyncActionCoordinator`]: parkwiz_action::AsyncActionCoordinator

pub mod backend;
pub mod flow;
pub mod login;
pub mod password_reset;
pub mod registration;

/// Field names shared by the pages.
pub mod fields {
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const CONFIRM_PASSWORD: &str = "confirmPassword";
    pub const FACILITY_NAME: &str = "facilityName";
    pub const FACILITY_ADDRESS: &str = "facilityAddress";
    pub const TOTAL_SPACES: &str = "totalSpaces";
    pub const ACCEPT_TERMS: &str = "acceptTerms";
    pub const REMEMBER_ME: &str = "rememberMe";
}

pub use backend::{AuthBackend, Credentials, InMemoryBackend, RegistrationRequest};
pub use flow::{
    build_flow, Flow, FlowCore, FlowError, FlowKind, FlowPhase, FlowSnapshot, Intent,
    IntentOutcome,
};
pub use login::LoginFlow;
pub use password_reset::PasswordResetFlow;
pub use registration::RegistrationFlow;

/// Step definitions of `kind`, for listing and documentation.
pub fn steps_for(
    kind: FlowKind,
    config: &parkwiz_core::EngineConfig,
) -> Vec<parkwiz_state::StepDefinition> {
    match kind {
        FlowKind::Registration => registration::steps(config),
        FlowKind::Login => login::steps(),
        FlowKind::PasswordReset => password_reset::steps(config),
    }
}
