//! The poll loop: fetch, detect, notify, sleep, repeat.
//!
//! One `PollLoop` value is one loop instance. It owns the `MonitorState`
//! for as long as it runs; the supervisor hands the baseline to the next
//! instance through the [`BaselineCheckpoint`] only after this one has
//! fully stopped.

use std::sync::Arc;
use std::time::Duration;

use ficsit_core::{MessageTemplate, MonitorState, TransitionEvent};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sleep::InterruptibleSleeper;
use super::supervisor::{BaselineCheckpoint, InternalFault};
use crate::fetcher::StateFetcher;
use crate::notifier::Notifier;

/// Collaborators and settings shared by every loop instance.
pub struct PollContext {
    pub fetcher: Arc<dyn StateFetcher>,
    pub notifier: Arc<dyn Notifier>,
    pub template: MessageTemplate,
    pub interval: Duration,
    pub cancel_token: CancellationToken,
}

/// Result of a single iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Snapshot taken, nothing to announce
    Unchanged { occupancy: u32 },
    /// A transition was detected and a notification attempted
    Transition(TransitionEvent),
    /// The fetch failed; the iteration was abandoned
    FetchFailed,
    /// Shutdown was requested while the fetch was in flight
    Cancelled,
    /// The snapshot broke an invariant; the instance must be replaced
    Faulted(InternalFault),
}

/// A single poll loop instance.
pub struct PollLoop {
    ctx: Arc<PollContext>,
    state: MonitorState,
    checkpoint: BaselineCheckpoint,
    sleeper: InterruptibleSleeper,
    instance: u64,
}

impl PollLoop {
    pub fn new(
        ctx: Arc<PollContext>,
        state: MonitorState,
        checkpoint: BaselineCheckpoint,
        instance: u64,
    ) -> Self {
        let sleeper = InterruptibleSleeper::new(ctx.cancel_token.clone());
        Self {
            ctx,
            state,
            checkpoint,
            sleeper,
            instance,
        }
    }

    /// Current baseline held by this instance.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Runs until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns the `InternalFault` of an iteration that hit a broken
    /// invariant. The supervisor decides whether to relaunch.
    pub async fn run(mut self) -> Result<(), InternalFault> {
        info!(
            instance = self.instance,
            baseline = ?self.state.last_occupancy(),
            interval_secs = self.ctx.interval.as_secs(),
            "Poll loop started"
        );

        loop {
            if self.ctx.cancel_token.is_cancelled() {
                break;
            }

            match self.poll_once().await {
                PollOutcome::Cancelled => break,
                PollOutcome::Faulted(fault) => return Err(fault),
                _ => {}
            }

            if self.sleeper.sleep(self.ctx.interval).await.is_err() {
                break;
            }
        }

        debug!(instance = self.instance, "Poll loop stopped");
        Ok(())
    }

    /// Performs one fetch → detect → notify cycle.
    ///
    /// The baseline is updated and committed before any notification is
    /// sent, so a crash during delivery never fires the same transition twice.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let result = self.ctx.fetcher.fetch().await;

        if self.ctx.cancel_token.is_cancelled() {
            debug!(instance = self.instance, "Shutdown requested during fetch");
            return PollOutcome::Cancelled;
        }

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(instance = self.instance, error = %e, "Failed to fetch server state");
                return PollOutcome::FetchFailed;
            }
        };

        if snapshot.exceeds_capacity() {
            return PollOutcome::Faulted(InternalFault::Invariant {
                instance: self.instance,
                reason: format!(
                    "occupancy {} exceeds capacity {}",
                    snapshot.occupancy, snapshot.capacity
                ),
            });
        }

        let event = self.state.observe(&snapshot);
        self.checkpoint.commit(self.state);

        let Some(event) = event else {
            debug!(
                instance = self.instance,
                occupancy = snapshot.occupancy,
                capacity = snapshot.capacity,
                "Occupancy unchanged"
            );
            return PollOutcome::Unchanged {
                occupancy: snapshot.occupancy,
            };
        };

        info!(
            instance = self.instance,
            kind = %event.kind,
            previous = event.previous,
            current = event.current,
            capacity = event.capacity,
            "Occupancy changed"
        );

        let message = self.ctx.template.transition(&event);
        if let Err(e) = self.ctx.notifier.notify(&message).await {
            warn!(instance = self.instance, error = %e, "Failed to deliver notification");
        }

        PollOutcome::Transition(event)
    }
}
