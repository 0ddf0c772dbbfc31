//! # parkwiz-action — Async Action Coordination
//!
//! One [`AsyncActionCoordinator`] owns the loading / outcome / cooldown state
//! of one logical action ("submit registration", "resend reset link", ...).
//! A flow that needs several independent actions creates several
//! coordinators; they never share state.
//!
//! ## Lifecycle
//!
//! ```text
//!            run                 work settles
//! Idle ───────────────▶ Running ───────────────▶ Succeeded | Failed(reason)
//!  ▲                       │                              │
//!  └──────── cancel ───────┴──────────── run ─────────────┘ (next run)
//! ```
//!
//! - A second `run` while `Running` is rejected with `Busy`, never queued.
//! - Work failures become `Failed(reason)`; nothing is thrown past the
//!   coordinator. A panicking work unit settles as `Failed(InternalError)`.
//! - `start_cooldown` counts down once per second; `run` is rejected with
//!   `CoolingDown` until it reaches zero.
//! - `cancel` (and dropping the coordinator) aborts in-flight work, stops the
//!   countdown and resets to `Idle`. Results of cancelled work are discarded.
//!
//! Work runs as a tokio task. Control state sits behind a `parking_lot`
//! mutex that is never held across an `.await`; snapshots are published on
//! a `tokio::sync::watch` channel.

pub mod coordinator;
pub mod status;

pub use coordinator::{AsyncActionCoordinator, RunTicket};
pub use status::{ActionStatus, AsyncOperationState};
