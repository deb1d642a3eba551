//! Cancellable sleep.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The sleep ended because shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Sleep interrupted by cancellation")]
pub struct Cancelled;

/// Sleeps for a duration unless the cancellation token fires first.
#[derive(Debug, Clone)]
pub struct InterruptibleSleeper {
    cancel_token: CancellationToken,
}

impl InterruptibleSleeper {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self { cancel_token }
    }

    /// Waits for `duration`.
    ///
    /// Returns `Err(Cancelled)` as soon as the token is cancelled, and
    /// immediately if it already was.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        tokio::select! {
            biased;

            _ = self.cancel_token.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
