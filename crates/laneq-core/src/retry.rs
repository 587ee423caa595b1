//! Retrying wrapper around any [`Operator`].
//!
//! The retries of one entry run inside its channel's single in-flight slot:
//! the entries queued behind it keep waiting until the last attempt resolves.
//!
//! A queue-level `operation_timeout` bounds all attempts of an entry
//! together. To give each attempt its own deadline, and have
//! [`RetryError::Timeout`] retry it, set
//! [`RetryOperator::with_attempt_timeout`].
use crate::context::OperationCtx;
use crate::error::LaneError;
use crate::operator::Operator;
use async_trait::async_trait;
use std::time::Duration;

/// How the pause between attempts grows.
#[derive(Clone, Copy, Debug)]
pub enum BackoffStrategy {
    /// The pause after attempt `n` is `n` times the initial backoff.
    Linear,
    /// The pause doubles after every attempt.
    Exponential,
}

/// Which operation errors trigger another attempt.
///
/// Cancellation is never retried. Panics are caught by the task queue
/// outside the retry wrapper, so a panicking attempt is not retried either.
#[derive(Clone, Copy, Debug)]
pub enum RetryError {
    /// Any failure or timeout.
    All,
    /// Only timeouts of a single attempt.
    Timeout,
    /// Only failures reported by the operator.
    Failed,
}

/// Attempt limit and pacing for an entry that keeps failing.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Attempts per entry, the first one included.
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    /// Upper bound on a single pause, before jitter.
    pub max_backoff: Duration,
    pub strategy: BackoffStrategy,
    /// Fixed extra pause added after the cap.
    pub jitter: Option<Duration>,
    pub retry_error: RetryError,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: usize,
        initial_backoff: Duration,
        max_backoff: Duration,
        strategy: BackoffStrategy,
        retry_error: RetryError,
    ) -> Self {
        RetryPolicy {
            max_attempts,
            initial_backoff,
            max_backoff,
            strategy,
            jitter: None,
            retry_error,
        }
    }

    /// Add `jitter` to every pause.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Whether `error`, returned by attempt number `attempt` (starting at 1),
    /// earns the entry another attempt.
    pub fn should_retry(&self, error: &LaneError, attempt: usize) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match (self.retry_error, error) {
            (_, LaneError::Cancelled | LaneError::NoRuntime) => false,
            (RetryError::All, _) => true,
            (RetryError::Timeout, e) => matches!(e, LaneError::Timeout(_)),
            (RetryError::Failed, e) => matches!(e, LaneError::Failed(_)),
        }
    }

    /// Pause to hold the channel for after attempt `attempt` failed.
    pub fn backoff_duration(&self, attempt: usize) -> Duration {
        let attempt = u32::try_from(attempt.max(1)).unwrap_or(u32::MAX);
        let factor = match self.strategy {
            BackoffStrategy::Linear => attempt,
            BackoffStrategy::Exponential => 1_u32.checked_shl(attempt - 1).unwrap_or(u32::MAX),
        };
        let pause = self.initial_backoff.saturating_mul(factor).min(self.max_backoff);
        self.jitter.map_or(pause, |jitter| pause.saturating_add(jitter))
    }
}

/// Wrap an existing operator with retry behavior according to the given policy.
///
/// ```rust
/// use laneq_core::{operator_fn, with_retry, BackoffStrategy, RetryError, RetryPolicy};
/// use std::time::Duration;
///
/// // up to 3 attempts, exponential backoff 100ms -> 200ms
/// let policy = RetryPolicy::new(
///     3,
///     Duration::from_millis(100),
///     Duration::from_secs(1),
///     BackoffStrategy::Exponential,
///     RetryError::All,
/// );
/// let deliver = operator_fn(|_peer: String, _stanza: String| async { Ok(()) });
/// let _retrying = with_retry(deliver, policy);
/// ```
pub fn with_retry<O>(operator: O, policy: RetryPolicy) -> RetryOperator<O> {
    RetryOperator::new(operator, policy)
}

/// Operator that re-runs `inner` according to a [`RetryPolicy`].
#[derive(Clone, Debug)]
pub struct RetryOperator<O> {
    pub inner: O,
    pub policy: RetryPolicy,
    attempt_ctx: OperationCtx,
}

impl<O> RetryOperator<O> {
    pub fn new(inner: O, policy: RetryPolicy) -> Self {
        RetryOperator {
            inner,
            policy,
            attempt_ctx: OperationCtx::new(),
        }
    }

    /// Bound every single attempt by `timeout`.
    ///
    /// An attempt that runs out resolves as [`LaneError::Timeout`] and is
    /// retried when the policy retries timeouts.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_ctx.set_timeout(timeout);
        self
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_ctx.timeout()
    }
}

#[async_trait]
impl<K, T, O> Operator<K, T> for RetryOperator<O>
where
    K: std::fmt::Debug + Send + Sync + 'static,
    T: Clone + Send + 'static,
    O: Operator<K, T>,
{
    async fn process(&self, key: &K, payload: T) -> Result<(), LaneError> {
        let mut attempt = 1;
        loop {
            let outcome = self
                .attempt_ctx
                .run_future(self.inner.process(key, payload.clone()))
                .await;
            match outcome {
                Ok(()) => return Ok(()),
                Err(e) if self.policy.should_retry(&e, attempt) => {
                    let backoff = self.policy.backoff_duration(attempt);
                    tracing::debug!(?key, attempt, ?backoff, error = %e, "attempt failed, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(?key, attempt, error = %e, "giving up on entry");
                    return Err(e);
                }
            }
        }
    }
}
