//! Start and stop of the supervised monitor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ficsit_core::{MessageTemplate, MonitorState};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::poller::PollContext;
use super::supervisor::{BaselineCheckpoint, CompletionTracker, Supervisor};
use crate::config::PollSettings;
use crate::fetcher::StateFetcher;
use crate::notifier::Notifier;

/// Errors returned by [`LifecycleCoordinator::start`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Monitor already started")]
    AlreadyStarted,

    #[error("Monitor has been shut down")]
    ShutDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Stopping,
}

/// Owns the cancellation token and completion tracker of the monitor.
///
/// # Example
///
/// ```ignore
/// let coordinator = LifecycleCoordinator::new(fetcher, notifier, template, &settings);
/// coordinator.start()?;
///
/// wait_for_shutdown_signal().await?;
/// coordinator.shutdown().await;
/// ```
pub struct LifecycleCoordinator {
    cancel_token: CancellationToken,
    tracker: CompletionTracker,
    supervisor: Arc<Supervisor>,
    initial_state: MonitorState,
    phase: Mutex<Phase>,
    stopped: AtomicBool,
}

impl LifecycleCoordinator {
    /// Creates a coordinator with a fresh cancellation token.
    pub fn new(
        fetcher: Arc<dyn StateFetcher>,
        notifier: Arc<dyn Notifier>,
        template: MessageTemplate,
        settings: &PollSettings,
    ) -> Self {
        Self::with_cancel_token(fetcher, notifier, template, settings, CancellationToken::new())
    }

    /// Creates a coordinator driven by an existing token.
    pub fn with_cancel_token(
        fetcher: Arc<dyn StateFetcher>,
        notifier: Arc<dyn Notifier>,
        template: MessageTemplate,
        settings: &PollSettings,
        cancel_token: CancellationToken,
    ) -> Self {
        // A zero baseline makes a populated server announce itself on the first poll
        let initial_state = if settings.notify_on_first_poll {
            MonitorState::with_baseline(0)
        } else {
            MonitorState::unknown()
        };

        let ctx = Arc::new(PollContext {
            fetcher,
            notifier,
            template,
            interval: settings.interval,
            cancel_token: cancel_token.clone(),
        });
        let tracker = CompletionTracker::new();
        let supervisor = Arc::new(Supervisor::new(
            ctx,
            tracker.clone(),
            BaselineCheckpoint::new(initial_state),
            settings.baseline_on_restart,
        ));

        Self {
            cancel_token,
            tracker,
            supervisor,
            initial_state,
            phase: Mutex::new(Phase::Idle),
            stopped: AtomicBool::new(false),
        }
    }

    /// Launches the first poll loop instance.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `LifecycleError::AlreadyStarted` on a second call
    /// - `LifecycleError::ShutDown` after `shutdown` was requested
    pub fn start(&self) -> Result<(), LifecycleError> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match *phase {
            Phase::Running => return Err(LifecycleError::AlreadyStarted),
            Phase::Stopping => return Err(LifecycleError::ShutDown),
            Phase::Idle => {}
        }
        if self.cancel_token.is_cancelled() {
            *phase = Phase::Stopping;
            return Err(LifecycleError::ShutDown);
        }

        *phase = Phase::Running;
        self.supervisor.launch(self.initial_state);
        info!(
            baseline = ?self.initial_state.last_occupancy(),
            "Monitor started"
        );
        Ok(())
    }

    /// Requests shutdown and waits until no poll loop instance is running.
    ///
    /// Safe to call repeatedly and concurrently. Every call returns only
    /// after the monitor has fully stopped. Exactly one call returns `true`:
    /// the one that recorded the stop.
    pub async fn shutdown(&self) -> bool {
        {
            let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            if *phase != Phase::Stopping {
                info!(active = self.tracker.active(), "Monitor shutdown requested");
                *phase = Phase::Stopping;
            }
        }

        self.cancel_token.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        let first = !self.stopped.swap(true, Ordering::SeqCst);
        if first {
            info!(restarts = self.restarts(), "Monitor stopped");
        }
        first
    }

    /// Clone of the token observed by every poll loop instance.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// True once a `shutdown` call has completed.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of poll loop instances still running.
    pub fn active_instances(&self) -> usize {
        self.tracker.active()
    }

    /// Number of automatic restarts so far.
    pub fn restarts(&self) -> u64 {
        self.supervisor.restarts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use ficsit_core::StateSnapshot;

    use crate::fetcher::FetchError;
    use crate::notifier::NotifyError;

    struct EmptyServer;

    #[async_trait]
    impl StateFetcher for EmptyServer {
        async fn fetch(&self) -> Result<StateSnapshot, FetchError> {
            Ok(StateSnapshot::new(0, 4))
        }
    }

    struct Silent;

    #[async_trait]
    impl Notifier for Silent {
        async fn notify(&self, _message: &str) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    fn coordinator() -> LifecycleCoordinator {
        LifecycleCoordinator::new(
            Arc::new(EmptyServer),
            Arc::new(Silent),
            MessageTemplate::default(),
            &PollSettings {
                interval: Duration::from_secs(60),
                ..Default::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_tracks_one_instance() {
        let coordinator = coordinator();
        assert_eq!(coordinator.active_instances(), 0);

        coordinator.start().unwrap();
        assert_eq!(coordinator.active_instances(), 1);

        assert!(coordinator.shutdown().await);
        assert_eq!(coordinator.active_instances(), 0);
        assert!(coordinator.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_fails() {
        let coordinator = coordinator();
        coordinator.start().unwrap();
        assert_eq!(coordinator.start(), Err(LifecycleError::AlreadyStarted));
        coordinator.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_after_shutdown_fails() {
        let coordinator = coordinator();
        coordinator.shutdown().await;
        assert_eq!(coordinator.start(), Err(LifecycleError::ShutDown));
        assert_eq!(coordinator.active_instances(), 0);
    }

    #[tokio::test]
    async fn test_start_with_cancelled_token_fails() {
        let token = CancellationToken::new();
        token.cancel();
        let coordinator = LifecycleCoordinator::with_cancel_token(
            Arc::new(EmptyServer),
            Arc::new(Silent),
            MessageTemplate::default(),
            &PollSettings::default(),
            token,
        );
        assert_eq!(coordinator.start(), Err(LifecycleError::ShutDown));
    }

    #[tokio::test]
    async fn test_shutdown_without_start_is_immediate() {
        let coordinator = coordinator();
        assert!(coordinator.shutdown().await);
        assert!(!coordinator.shutdown().await);
        assert!(coordinator.is_cancelled());
    }

    #[test]
    fn test_notify_on_first_poll_uses_zero_baseline() {
        let coordinator = LifecycleCoordinator::new(
            Arc::new(EmptyServer),
            Arc::new(Silent),
            MessageTemplate::default(),
            &PollSettings {
                notify_on_first_poll: true,
                ..Default::default()
            },
        );
        assert_eq!(coordinator.initial_state.last_occupancy(), Some(0));
        assert_eq!(coordinator.restarts(), 0);
    }
}
