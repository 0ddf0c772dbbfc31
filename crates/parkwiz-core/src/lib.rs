//! # parkwiz-core — Foundational Types for the Form Wizard Engine
//!
//! Every other `parkwiz-*` crate depends on this one; it depends on nothing
//! internal. It defines the vocabulary shared by validation, navigation and
//! async-action coordination.
//!
//! ## Key Design Principles
//!
//! 1. **One error taxonomy.** [`ErrorKind`] covers validation failures,
//!    navigation rejections, coordinator rejections and backend outcomes.
//!    Hosts branch on it; nothing in the engine throws it past a boundary.
//!
//! 2. **Newtype wrappers for identifiers.** `FieldId`, `StepId`,
//!    `OperationId`, `FlowId`. No bare strings crossing crate boundaries.
//!
//! 3. **Configuration is data.** [`EngineConfig`] is loaded once by the host
//!    (defaults, environment, or YAML) and handed to flow constructors.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `parkwiz-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod identity;
pub mod strength;

pub use config::{ConfigError, EngineConfig};
pub use error::ErrorKind;
pub use identity::{FieldId, FlowId, OperationId, StepId};
pub use strength::PasswordStrengthLevel;
