//! Future-based task queue on top of [`KeyedSerialQueue`].
//!
//! Each entry is handed to an [`Operator`] whose future is spawned on the
//! Tokio runtime the queue was created in. The channel is released when the
//! future resolves, whatever the outcome: success, error, timeout,
//! cancellation and panic all complete the entry, so a failing operation
//! never stalls its channel.
//!
//! Failures are logged through `tracing`; they are never handed back to the
//! code that enqueued the work.
//!
//! ```rust
//! use laneq_core::{operator_fn, QueueConfig, TaskQueue};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), laneq_core::LaneError> {
//! let config = QueueConfig::new()
//!     .with_name("sessions")
//!     .with_operation_timeout(Duration::from_secs(5));
//! let queue = TaskQueue::with_config(config, operator_fn(|session: String, cmd: String| async move {
//!     tracing::info!(%session, %cmd, "handling command");
//!     Ok(())
//! }))?;
//! queue.enqueue("alice".to_string(), "login".to_string());
//! queue.enqueue("alice".to_string(), "send".to_string());
//! queue.idle().await;
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::{debug, error, trace, warn, Instrument, Span};

use crate::config::QueueConfig;
use crate::context::OperationCtx;
use crate::error::LaneError;
use crate::operator::Operator;
use crate::queue::{Done, KeyedSerialQueue};

/// A keyed serial queue whose work items are processed by an async [`Operator`].
pub struct TaskQueue<K: Debug, T> {
    queue: KeyedSerialQueue<K, T, Span>,
    ctx: OperationCtx,
}

impl<K: Debug, T> Clone for TaskQueue<K, T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<K, T> TaskQueue<K, T>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Create a task queue with the default configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<O>(operator: O) -> Result<Self, LaneError>
    where
        O: Operator<K, T>,
    {
        Self::with_config(QueueConfig::default(), operator)
    }

    pub fn with_config<O>(config: QueueConfig, operator: O) -> Result<Self, LaneError>
    where
        O: Operator<K, T>,
    {
        let handle = Handle::try_current().map_err(|_| LaneError::NoRuntime)?;
        let mut ctx = OperationCtx::new();
        if let Some(timeout) = config.operation_timeout {
            ctx.set_timeout(timeout);
        }

        let operator = Arc::new(operator);
        let op_ctx = ctx.clone();
        let name: Arc<str> = Arc::from(config.name.as_str());
        let queue = KeyedSerialQueue::with_config(config, move |payload: T, done: Done<K, T, Span>| {
            let operator = Arc::clone(&operator);
            let ctx = op_ctx.clone();
            let name = Arc::clone(&name);
            // the enqueuer's span, or the one restored for a queued entry
            let span = Span::current();
            handle.spawn(async move {
                let key = done.key().clone();
                async {
                    let outcome = AssertUnwindSafe(ctx.run_future(operator.process(&key, payload)))
                        .catch_unwind()
                        .await;
                    match outcome {
                        Ok(Ok(())) => trace!(queue = %name, key = ?key, "operation completed"),
                        Ok(Err(LaneError::Cancelled)) => {
                            debug!(queue = %name, key = ?key, "operation cancelled")
                        }
                        Ok(Err(e)) => warn!(queue = %name, key = ?key, error = %e, "operation failed"),
                        Err(panic) => error!(
                            queue = %name,
                            key = ?key,
                            error = %LaneError::Panicked(panic_message(panic.as_ref())),
                            "operation panicked"
                        ),
                    }
                }
                .instrument(span)
                .await;
                // outside the span, so the next entry does not inherit it
                done.done();
            });
        });
        Ok(Self { queue, ctx })
    }

    pub fn config(&self) -> &QueueConfig {
        self.queue.config()
    }

    /// Enqueue `payload` on the channel `key`.
    ///
    /// The operation for an idle channel is spawned right away; otherwise it
    /// is spawned after the operations queued before it have resolved, inside
    /// the span that was current at this call.
    pub fn enqueue(&self, key: K, payload: T) {
        self.queue.enqueue(key, payload);
    }

    /// Enqueue `payload` on the channel `key`, running its operation in `span`.
    pub fn enqueue_in(&self, key: K, payload: T, span: Span) {
        self.queue.enqueue_in(key, payload, span);
    }

    /// Cancel the in-flight operations and everything still queued.
    ///
    /// Cancelled entries still complete in order, resolving immediately as
    /// [`LaneError::Cancelled`], so every channel drains.
    pub fn shutdown(&self) {
        debug!(queue = %self.queue.config().name, "shutting down task queue");
        self.ctx.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.ctx.is_cancelled()
    }

    /// Wait until every channel has drained.
    pub async fn idle(&self) {
        self.queue.idle().await;
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn channel_count(&self) -> usize {
        self.queue.channel_count()
    }

    pub fn is_active(&self, key: &K) -> bool {
        self.queue.is_active(key)
    }

    pub fn pending_len(&self, key: &K) -> usize {
        self.queue.pending_len(key)
    }
}

impl<K: Debug, T> Debug for TaskQueue<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("queue", &self.queue)
            .field("shutdown", &self.ctx.is_cancelled())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
