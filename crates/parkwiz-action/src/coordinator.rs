//! # Async Action Coordinator
//!
//! Single-flight execution of one logical action with outcome capture and
//! an optional resend cooldown.
//!
//! Two generation counters guard against stale writers. Every accepted
//! `run` and every `cancel_work` bumps the work generation; a settling task
//! only writes its outcome if the generation it was started with is still
//! current. The cooldown ticker is guarded the same way.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{interval_at, Instant};
use tracing::Instrument;

use parkwiz_core::{ErrorKind, OperationId};

use crate::status::{ActionStatus, AsyncOperationState};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Control {
    work_generation: u64,
    cooldown_generation: u64,
    work: Option<AbortHandle>,
    cooldown: Option<AbortHandle>,
}

#[derive(Debug)]
struct Shared {
    control: Mutex<Control>,
    state: watch::Sender<AsyncOperationState>,
}

impl Shared {
    fn snapshot(&self) -> AsyncOperationState {
        self.state.borrow().clone()
    }
}

/// Owner of one action's loading / outcome / cooldown state.
#[derive(Debug)]
pub struct AsyncActionCoordinator {
    shared: Arc<Shared>,
    timeout: Option<Duration>,
}

impl Default for AsyncActionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncActionCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(AsyncOperationState::default());
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control::default()),
                state,
            }),
            timeout: None,
        }
    }

    /// Settle runs that take longer than `timeout` as `Failed(Timeout)`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Current state.
    pub fn snapshot(&self) -> AsyncOperationState {
        self.shared.snapshot()
    }

    pub fn status(&self) -> ActionStatus {
        self.shared.state.borrow().status.clone()
    }

    /// Whether `run` would be accepted right now.
    pub fn is_available(&self) -> bool {
        self.shared.state.borrow().is_available()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<AsyncOperationState> {
        self.shared.state.subscribe()
    }

    /// Start `work` unless the action is running or cooling down.
    ///
    /// Returns immediately; the outcome is published when `work` settles.
    /// Must be called from within a tokio runtime.
    pub fn run<F, Fut>(
        &self,
        operation: impl Into<OperationId>,
        work: F,
    ) -> Result<RunTicket, ErrorKind>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ErrorKind>> + Send + 'static,
    {
        let operation = operation.into();
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!(operation = %operation, "run called outside a tokio runtime");
            return Err(ErrorKind::InternalError);
        };

        let mut control = self.shared.control.lock();
        let current = self.shared.snapshot();
        if current.status.is_running() {
            tracing::warn!(operation = %operation, "rejected run: action already running");
            return Err(ErrorKind::Busy);
        }
        if current.cooldown_remaining_secs > 0 {
            tracing::warn!(
                operation = %operation,
                remaining_secs = current.cooldown_remaining_secs,
                "rejected run: action cooling down"
            );
            return Err(ErrorKind::CoolingDown {
                remaining_secs: current.cooldown_remaining_secs,
            });
        }

        control.work_generation += 1;
        let generation = control.work_generation;
        let run_seq = current.run_seq + 1;
        self.shared.state.send_modify(|s| {
            s.status = ActionStatus::Running;
            s.operation = Some(operation.clone());
            s.run_seq = run_seq;
        });

        let span = tracing::info_span!("action", operation = %operation, run_seq);
        let timeout = self.timeout;
        let task = runtime.spawn(
            async move {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, work())
                        .await
                        .unwrap_or(Err(ErrorKind::Timeout)),
                    None => work().await,
                }
            }
            .instrument(span),
        );
        control.work = Some(task.abort_handle());
        runtime.spawn(settle(
            Arc::clone(&self.shared),
            generation,
            operation.clone(),
            task,
        ));
        drop(control);

        tracing::debug!(operation = %operation, run_seq, "action started");
        Ok(RunTicket {
            operation,
            run_seq,
            receiver: self.shared.state.subscribe(),
        })
    }

    /// Start `work` and wait for it to settle.
    pub async fn run_and_wait<F, Fut>(
        &self,
        operation: impl Into<OperationId>,
        work: F,
    ) -> Result<ActionStatus, ErrorKind>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ErrorKind>> + Send + 'static,
    {
        let ticket = self.run(operation, work)?;
        Ok(ticket.wait().await)
    }

    /// Disable the action for `seconds`, counting down once per second.
    ///
    /// Replaces any countdown already in progress. Must be called from
    /// within a tokio runtime when `seconds > 0`.
    pub fn start_cooldown(&self, seconds: u32) -> Result<(), ErrorKind> {
        let mut control = self.shared.control.lock();
        control.cooldown_generation += 1;
        if let Some(handle) = control.cooldown.take() {
            handle.abort();
        }
        if seconds == 0 {
            self.shared
                .state
                .send_modify(|s| s.cooldown_remaining_secs = 0);
            return Ok(());
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::error!("start_cooldown called outside a tokio runtime");
            self.shared
                .state
                .send_modify(|s| s.cooldown_remaining_secs = 0);
            return Err(ErrorKind::InternalError);
        };

        self.shared
            .state
            .send_modify(|s| s.cooldown_remaining_secs = seconds);
        let generation = control.cooldown_generation;
        let ticker = runtime.spawn(tick_cooldown(Arc::clone(&self.shared), generation));
        control.cooldown = Some(ticker.abort_handle());
        tracing::debug!(seconds, "cooldown started");
        Ok(())
    }

    /// Abort in-flight work. Its result, if any, is discarded. Idempotent.
    pub fn cancel_work(&self) {
        let mut control = self.shared.control.lock();
        control.work_generation += 1;
        if let Some(handle) = control.work.take() {
            handle.abort();
            tracing::debug!("in-flight work cancelled");
        }
        self.shared.state.send_modify(|s| {
            if s.status.is_running() {
                s.status = ActionStatus::Idle;
            }
        });
    }

    /// Stop the countdown and re-enable the action. Idempotent.
    pub fn cancel_cooldown(&self) {
        let mut control = self.shared.control.lock();
        control.cooldown_generation += 1;
        if let Some(handle) = control.cooldown.take() {
            handle.abort();
        }
        self.shared
            .state
            .send_modify(|s| s.cooldown_remaining_secs = 0);
    }

    /// Cancel work and countdown and return to `Idle`.
    ///
    /// Call when the hosting flow is torn down. A following `run` is
    /// accepted immediately.
    pub fn cancel(&self) {
        self.cancel_work();
        self.cancel_cooldown();
        self.shared.state.send_modify(|s| s.status = ActionStatus::Idle);
    }
}

impl Drop for AsyncActionCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Handle to one accepted run.
#[derive(Debug)]
pub struct RunTicket {
    operation: OperationId,
    run_seq: u64,
    receiver: watch::Receiver<AsyncOperationState>,
}

impl RunTicket {
    pub fn operation(&self) -> &OperationId {
        &self.operation
    }

    pub fn run_seq(&self) -> u64 {
        self.run_seq
    }

    /// Wait until this run leaves `Running`.
    ///
    /// Returns the settled status, or `Idle` if the run was cancelled.
    pub async fn wait(mut self) -> ActionStatus {
        loop {
            if let Some(status) = self.observe() {
                return status;
            }
            if self.receiver.changed().await.is_err() {
                return self.observe().unwrap_or(ActionStatus::Idle);
            }
        }
    }

    fn observe(&mut self) -> Option<ActionStatus> {
        let state = self.receiver.borrow_and_update();
        if state.run_seq != self.run_seq {
            return Some(ActionStatus::Idle);
        }
        if state.status.is_running() {
            return None;
        }
        Some(state.status.clone())
    }
}

async fn settle(
    shared: Arc<Shared>,
    generation: u64,
    operation: OperationId,
    task: JoinHandle<Result<(), ErrorKind>>,
) {
    let outcome = match task.await {
        Ok(Ok(())) => ActionStatus::Succeeded,
        Ok(Err(kind)) => ActionStatus::Failed(kind),
        Err(e) if e.is_panic() => {
            tracing::error!(operation = %operation, "action work panicked");
            ActionStatus::Failed(ErrorKind::InternalError)
        }
        // Aborted by cancel; state was already reset.
        Err(_) => return,
    };
    record_outcome(&shared, generation, &operation, outcome);
}

fn record_outcome(
    shared: &Shared,
    generation: u64,
    operation: &OperationId,
    outcome: ActionStatus,
) {
    let mut control = shared.control.lock();
    if control.work_generation != generation {
        tracing::debug!(operation = %operation, "discarding result of cancelled run");
        return;
    }
    control.work = None;
    tracing::info!(operation = %operation, status = %outcome, "action settled");
    shared.state.send_modify(|s| s.status = outcome);
}

async fn tick_cooldown(shared: Arc<Shared>, generation: u64) {
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    loop {
        ticker.tick().await;
        if !tick_once(&shared, generation) {
            return;
        }
    }
}

/// Decrement the countdown. Returns whether ticking should continue.
fn tick_once(shared: &Shared, generation: u64) -> bool {
    let mut control = shared.control.lock();
    if control.cooldown_generation != generation {
        return false;
    }
    let mut remaining = 0;
    shared.state.send_modify(|s| {
        s.cooldown_remaining_secs = s.cooldown_remaining_secs.saturating_sub(1);
        remaining = s.cooldown_remaining_secs;
    });
    if remaining == 0 {
        control.cooldown = None;
        tracing::debug!("cooldown finished");
        return false;
    }
    true
}
