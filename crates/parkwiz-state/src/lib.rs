//! # parkwiz-state — Wizard Navigation State Machine
//!
//! Owns the ordered list of steps and the mutable [`WizardState`]. The
//! states are the step indices `0..N-1`; a flow's terminal "completed"
//! state is owned by whoever runs the final submit action, never by the
//! controller.
//!
//! ```text
//! step 0 ──advance (valid)──▶ step 1 ──advance (valid)──▶ … ──▶ step N-1
//!    ◀──────── back ─────────    ◀──────── back ────────
//! ```
//!
//! ## Design
//!
//! Steps are runtime data (each page supplies its own list), so the machine
//! is an index with validated transitions rather than a typestate. Forward
//! moves are gated on the step aggregator; backward moves never are.
//! Errors are revalidated lazily: `set_field` only clears the edited
//! field's error, `advance` and `validate_current_step` recompute.

pub mod step;
pub mod wizard;

pub use step::{StepDefinition, WizardError};
pub use wizard::{
    NavigationOutcome, NavigationRecord, WizardController, WizardSnapshot, WizardState,
    REDACTED,
};
