use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::LaneError;

/// The asynchronous unit of work run for each entry of a task queue.
///
/// Entries of the same key are never processed concurrently; the next one
/// starts after the returned future resolves.
#[async_trait]
pub trait Operator<K, T>: Send + Sync + 'static
where
    K: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Process one payload of the channel `key`.
    async fn process(&self, key: &K, payload: T) -> Result<(), LaneError>;
}

/// An operator backed by a closure returning a future.
pub struct FnOperator<K, T, F> {
    f: F,
    _phantom: PhantomData<fn(K, T)>,
}

/// Wrap a closure `(key, payload) -> impl Future` as an [`Operator`].
///
/// The closure receives its own clone of the key.
pub fn operator_fn<K, T, F, Fut>(f: F) -> FnOperator<K, T, F>
where
    F: Fn(K, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), LaneError>> + Send + 'static,
{
    FnOperator {
        f,
        _phantom: PhantomData,
    }
}

#[async_trait]
impl<K, T, F, Fut> Operator<K, T> for FnOperator<K, T, F>
where
    K: Clone + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(K, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), LaneError>> + Send + 'static,
{
    async fn process(&self, key: &K, payload: T) -> Result<(), LaneError> {
        (self.f)(key.clone(), payload).await
    }
}
