//! Per-key serialized queues.
//!
//! [`KeyedSerialQueue`] is the callback-driven core: work items tagged with a
//! channel key are handed to an operator one at a time per channel, in FIFO
//! order, with distinct channels running independently. [`TaskQueue`] layers
//! async operators, timeouts, cancellation and panic isolation on top of it.

pub mod ambient;
pub mod config;
pub mod context;
pub mod error;
pub mod operator;
pub mod queue;
pub mod retry;
pub mod task;


pub use ambient::AmbientContext;
pub use config::QueueConfig;
pub use context::OperationCtx;
pub use error::LaneError;
pub use operator::{operator_fn, FnOperator, Operator};
pub use queue::{Done, KeyedSerialQueue};
pub use retry::{with_retry, BackoffStrategy, RetryError, RetryOperator, RetryPolicy};
pub use task::TaskQueue;
