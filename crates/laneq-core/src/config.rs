//! Queue configuration.

use std::time::Duration;

/// Configuration shared by [`KeyedSerialQueue`](crate::queue::KeyedSerialQueue)
/// and [`TaskQueue`](crate::task::TaskQueue).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Name recorded on log events, to tell queues apart
    pub name: String,
    /// Capture the ambient context for entries that have to wait behind
    /// in-flight work
    pub capture_context: bool,
    /// Deadline for a single operation (async layer only)
    pub operation_timeout: Option<Duration>,
}

impl QueueConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            name: "laneq".to_string(),
            capture_context: true,
            operation_timeout: None,
        }
    }

    /// Set the queue name used in log events.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable or disable ambient context capture on enqueue.
    pub fn with_capture_context(mut self, capture: bool) -> Self {
        self.capture_context = capture;
        self
    }

    /// Bound every operation of a task queue by `timeout`.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}
