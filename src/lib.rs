//! # Laneq - per-key serialized task queues in Rust
//!
//! Work tagged with a channel key runs one item at a time per channel, in
//! the order it was enqueued, while different channels proceed
//! independently. Typical channels are a session, a connection or any other
//! logical resource whose operations must not overlap.
//!
//! Two layers are provided:
//!
//! - [`KeyedSerialQueue`]: callback-driven core. The operator receives each
//!   payload with a [`Done`] handle and calls it when finished.
//! - [`TaskQueue`]: async operators on a Tokio runtime, with optional
//!   per-operation timeouts, cancellation on shutdown and retries.
//!
//! Queued items keep the ambient context (by default the current `tracing`
//! span) they were enqueued in.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! laneq = "0.3"
//! ```

/// Initialize the library with default settings.
///
/// This sets up tracing for better logging.
pub fn init() {
    tracing_subscriber::fmt::init();
}

// Re-export the core crate
pub use laneq_core as core;

pub use laneq_core::{
    operator_fn, with_retry, AmbientContext, BackoffStrategy, Done, KeyedSerialQueue, LaneError,
    Operator, QueueConfig, RetryError, RetryOperator, RetryPolicy, TaskQueue,
};
