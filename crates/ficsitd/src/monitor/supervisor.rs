//! Restart-on-fault supervision of poll loop instances.
//!
//! Each instance is a tracked task that runs a [`PollLoop`] body in its own
//! spawned task and joins it. The body either returns an [`InternalFault`]
//! itself or panics; a panic surfaces as a `JoinError` and is converted into
//! `InternalFault::Panicked`. Unless shutdown has been
//! requested, the faulted instance launches its replacement (tracker +1)
//! and then exits (tracker -1), so the tracker never reaches zero while a
//! restart is in progress. The replacement starts only after the faulted
//! body has been joined, so two bodies never touch the baseline at once.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ficsit_core::MonitorState;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use super::poller::{PollContext, PollLoop};
use crate::config::BaselineOnRestart;

/// Unexpected fault inside a poll loop instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalFault {
    #[error("Poll loop instance {instance} panicked: {message}")]
    Panicked { instance: u64, message: String },

    #[error("Poll loop instance {instance} broke an invariant: {reason}")]
    Invariant { instance: u64, reason: String },
}

impl InternalFault {
    fn from_panic(instance: u64, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked { instance, message }
    }
}

/// Counts supervised instances that are still running.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    tracker: TaskTracker,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a tracked task.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    /// Number of tracked tasks still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Allows `wait` to complete once the count reaches zero.
    pub fn close(&self) {
        self.tracker.close();
    }

    /// Resolves when closed and no tracked task is left.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }
}

/// Last committed baseline, read by the supervisor after a crash.
///
/// Written only by the running instance and read only once that instance
/// has been joined, so the lock is never contended.
#[derive(Debug, Clone, Default)]
pub struct BaselineCheckpoint {
    state: Arc<Mutex<MonitorState>>,
}

impl BaselineCheckpoint {
    pub fn new(state: MonitorState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn commit(&self, state: MonitorState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn restore(&self) -> MonitorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Launches and relaunches poll loop instances.
pub(crate) struct Supervisor {
    ctx: Arc<PollContext>,
    tracker: CompletionTracker,
    checkpoint: BaselineCheckpoint,
    baseline_on_restart: BaselineOnRestart,
    next_instance: AtomicU64,
    restarts: AtomicU64,
}

impl Supervisor {
    pub(crate) fn new(
        ctx: Arc<PollContext>,
        tracker: CompletionTracker,
        checkpoint: BaselineCheckpoint,
        baseline_on_restart: BaselineOnRestart,
    ) -> Self {
        Self {
            ctx,
            tracker,
            checkpoint,
            baseline_on_restart,
            next_instance: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
        }
    }

    /// Number of restarts performed so far.
    pub(crate) fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Spawns a new tracked instance starting from `state`.
    pub(crate) fn launch(self: &Arc<Self>, state: MonitorState) {
        let instance = self.next_instance.fetch_add(1, Ordering::SeqCst);
        let supervisor = Arc::clone(self);

        self.tracker.spawn(async move {
            match supervisor.run_instance(instance, state).await {
                Ok(()) => debug!(instance, "Poll loop instance finished"),
                Err(fault) => supervisor.handle_fault(fault),
            }
        });
    }

    /// Runs one loop body to completion and reports how it ended.
    async fn run_instance(&self, instance: u64, state: MonitorState) -> Result<(), InternalFault> {
        let body = PollLoop::new(
            Arc::clone(&self.ctx),
            state,
            self.checkpoint.clone(),
            instance,
        );

        match tokio::spawn(body.run()).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(InternalFault::from_panic(instance, e.into_panic())),
            Err(e) => {
                // Aborted by runtime shutdown; nothing left to supervise
                debug!(instance, error = %e, "Poll loop instance aborted");
                Ok(())
            }
        }
    }

    fn handle_fault(self: &Arc<Self>, fault: InternalFault) {
        if self.ctx.cancel_token.is_cancelled() {
            warn!(error = %fault, "Poll loop faulted during shutdown, not restarting");
            return;
        }

        let state = match self.baseline_on_restart {
            BaselineOnRestart::Preserve => self.checkpoint.restore(),
            BaselineOnRestart::Reset => MonitorState::unknown(),
        };
        let restarts = self.restarts.fetch_add(1, Ordering::SeqCst) + 1;

        error!(
            error = %fault,
            restarts,
            baseline = ?state.last_occupancy(),
            "Poll loop crashed, restarting"
        );

        self.launch(state);
    }
}
