use thiserror::Error;
use std::time::Duration;

/// Errors produced by the async operator layer.
///
/// The callback queue itself never fails; these only surface from
/// [`TaskQueue`](crate::task::TaskQueue) operations and their wrappers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaneError {
    #[error("Operation failed: {0}")]
    Failed(String),
    /// The queue was shut down while the operation was pending or running.
    #[error("Operation cancelled")]
    Cancelled,
    /// The operation exceeded the configured per-operation deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    /// The operation panicked; the payload message is kept when it is a string.
    #[error("Operation panicked: {0}")]
    Panicked(String),
    /// A task queue was constructed outside of a Tokio runtime.
    #[error("No Tokio runtime is active")]
    NoRuntime,
}

impl LaneError {
    pub fn failed(msg: impl Into<String>) -> Self {
        LaneError::Failed(msg.into())
    }
}
