//! # parkwiz-validation — Field Rules, Strength Scoring, Step Aggregation
//!
//! The pure half of the engine. Nothing in this crate holds state, spawns
//! tasks, or panics on user input; every function is deterministic for
//! identical input so hosts can call it on every keystroke.
//!
//! - **Rules** (`rule.rs`): [`Rule`] checks and the per-field [`FieldRule`]
//!   with its required gate.
//! - **Strength** (`strength.rs`): [`score`] maps a password to a
//!   [`PasswordStrengthLevel`]; [`StrengthReport`] exposes the criteria.
//! - **Aggregate** (`aggregate.rs`): [`evaluate`] runs all rules of one step
//!   and produces a [`StepEvaluation`].

pub mod aggregate;
pub mod rule;
pub mod strength;

pub use aggregate::{evaluate, StepEvaluation};
pub use rule::{
    is_blank, CustomValidator, FieldRule, FieldValues, Rule, ValidationContext, ValidationResult,
};
pub use strength::{report, score, StrengthReport, MIN_LENGTH_FOR_POINT};

pub use parkwiz_core::PasswordStrengthLevel;
