use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use crate::error::LaneError;

/// Cancellation and deadline shared by every operation of a task queue.
#[derive(Clone, Debug, Default)]
pub struct OperationCtx {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl OperationCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn set_timeout(&mut self, d: Duration) {
        self.timeout = Some(d);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Cancel every current and future operation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true if the operations have been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Asynchronously wait until the operations are cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Runs the provided future, respecting cancellation and optional timeout.
    ///
    /// Once cancelled, the future is not polled at all.
    pub async fn run_future<R, F>(&self, fut: F) -> Result<R, LaneError>
    where
        F: Future<Output = Result<R, LaneError>>,
    {
        if self.is_cancelled() {
            return Err(LaneError::Cancelled);
        }
        if let Some(duration) = self.timeout {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(LaneError::Cancelled),
                _ = tokio::time::sleep(duration) => Err(LaneError::Timeout(duration)),
                res = fut => res,
            }
        } else {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(LaneError::Cancelled),
                res = fut => res,
            }
        }
    }
}
