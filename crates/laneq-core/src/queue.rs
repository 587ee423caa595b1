//! Keyed serial queue.
//!
//! Work items are tagged with a channel key. At most one item per channel is
//! in flight at a time; later items for the same channel wait in FIFO order,
//! while items for other channels are dispatched independently.
//!
//! The operator receives each payload together with a [`Done`] handle and
//! signals readiness for the next item of that channel by calling
//! [`Done::done`]. An item enqueued on an idle channel is dispatched right
//! away on the caller's stack; the channel is registered before the operator
//! runs, so enqueues made from inside the operator queue up behind it.
//!
//! # Example
//!
//! ```rust
//! use laneq_core::{Done, KeyedSerialQueue};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = seen.clone();
//! let queue = KeyedSerialQueue::new(
//!     move |item: u32, done: Done<&'static str, u32, ()>| {
//!         log.lock().unwrap().push((*done.key(), item));
//!         done.done();
//!     },
//! );
//! queue.enqueue("a", 1);
//! queue.enqueue("a", 2);
//! queue.enqueue("b", 1);
//! assert_eq!(*seen.lock().unwrap(), vec![("a", 1), ("a", 2), ("b", 1)]);
//! assert!(queue.is_idle());
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{trace, warn, Span};

use crate::ambient::AmbientContext;
use crate::config::QueueConfig;

type OperatorFn<K, T, C> = dyn Fn(T, Done<K, T, C>) + Send + Sync;

type Registry<K, T, C> = HashMap<K, Channel<T, C>>;

struct QueueEntry<T, C> {
    payload: T,
    context: Option<C>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    // operator is running on a dispatch loop's stack
    Dispatching,
    // completion arrived before the operator returned; the loop takes the next entry
    Completed,
    // operator returned without completing; the Done handle takes the next entry
    InFlight,
}

struct Channel<T, C> {
    // queued entries, not counting the in-flight one
    pending: VecDeque<QueueEntry<T, C>>,
    phase: Phase,
}

impl<T, C> Channel<T, C> {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            phase: Phase::Dispatching,
        }
    }
}

struct Shared<K: Debug, T, C> {
    channels: Mutex<Registry<K, T, C>>,
    operator: Box<OperatorFn<K, T, C>>,
    config: QueueConfig,
    idle: Notify,
}

impl<K, T, C> Shared<K, T, C>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    T: Send + 'static,
    C: AmbientContext,
{
    // registry mutations are single-step, so a poisoned map is still consistent
    fn lock(&self) -> MutexGuard<'_, Registry<K, T, C>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the operator for `entry`, then keep going for as long as the
    /// operator completes before returning.
    fn dispatch(self: &Arc<Self>, key: K, mut entry: QueueEntry<T, C>) {
        loop {
            let QueueEntry { payload, context } = entry;
            trace!(queue = %self.config.name, key = ?key, "dispatching entry");
            let done = Done {
                shared: Arc::clone(self),
                key: key.clone(),
                context: context.clone(),
                signalled: false,
            };
            match context {
                Some(ctx) => ctx.in_scope(|| (self.operator)(payload, done)),
                None => (self.operator)(payload, done),
            }

            let mut channels = self.lock();
            let Some(channel) = channels.get_mut(&key) else {
                return;
            };
            match channel.phase {
                Phase::Completed => match channel.pending.pop_front() {
                    Some(next) => {
                        channel.phase = Phase::Dispatching;
                        entry = next;
                    }
                    None => {
                        self.release(channels, &key);
                        return;
                    }
                },
                Phase::Dispatching => {
                    channel.phase = Phase::InFlight;
                    return;
                }
                Phase::InFlight => return,
            }
        }
    }

    fn complete(self: &Arc<Self>, key: K) {
        let next = {
            let mut channels = self.lock();
            let Some(channel) = channels.get_mut(&key) else {
                warn!(queue = %self.config.name, key = ?key, "completion signalled for unknown channel");
                return;
            };
            match channel.phase {
                Phase::Dispatching => {
                    channel.phase = Phase::Completed;
                    return;
                }
                Phase::Completed => return,
                Phase::InFlight => match channel.pending.pop_front() {
                    Some(next) => {
                        channel.phase = Phase::Dispatching;
                        next
                    }
                    None => {
                        self.release(channels, &key);
                        return;
                    }
                },
            }
        };
        self.dispatch(key, next);
    }

    fn release(&self, mut channels: MutexGuard<'_, Registry<K, T, C>>, key: &K) {
        channels.remove(key);
        let idle = channels.is_empty();
        drop(channels);
        trace!(queue = %self.config.name, key = ?key, "channel drained");
        if idle {
            self.idle.notify_waiters();
        }
    }
}

/// Completion handle passed to the operator with every payload.
///
/// Calling [`done`](Done::done) releases the channel for its next entry.
/// Dropping the handle without calling it leaves the channel stalled: the
/// entries queued behind it are never dispatched.
pub struct Done<K: Debug, T, C = Span> {
    shared: Arc<Shared<K, T, C>>,
    key: K,
    context: Option<C>,
    signalled: bool,
}

impl<K, T, C> Done<K, T, C>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    T: Send + 'static,
    C: AmbientContext,
{
    /// Key of the channel this dispatch belongs to.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Context the dispatch was entered in, if one was captured or supplied.
    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    /// Signal that the current entry is finished.
    pub fn done(mut self) {
        self.signalled = true;
        let shared = Arc::clone(&self.shared);
        let key = self.key.clone();
        drop(self);
        shared.complete(key);
    }
}

impl<K: Debug, T, C> Drop for Done<K, T, C> {
    fn drop(&mut self) {
        if !self.signalled {
            warn!(
                queue = %self.shared.config.name,
                key = ?self.key,
                "completion handle dropped without signalling, channel stalled"
            );
        }
    }
}

impl<K: Debug, T, C> Debug for Done<K, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("key", &self.key)
            .field("signalled", &self.signalled)
            .finish()
    }
}

/// A queue that serializes work per channel key.
///
/// `C` is the ambient context captured for entries that have to wait; it
/// defaults to the current `tracing` span.
pub struct KeyedSerialQueue<K: Debug, T, C = Span> {
    shared: Arc<Shared<K, T, C>>,
}

impl<K: Debug, T, C> Clone for KeyedSerialQueue<K, T, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, T, C> KeyedSerialQueue<K, T, C>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    T: Send + 'static,
    C: AmbientContext,
{
    /// Create a queue around `operator` with the default configuration.
    pub fn new<F>(operator: F) -> Self
    where
        F: Fn(T, Done<K, T, C>) + Send + Sync + 'static,
    {
        Self::with_config(QueueConfig::default(), operator)
    }

    pub fn with_config<F>(config: QueueConfig, operator: F) -> Self
    where
        F: Fn(T, Done<K, T, C>) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                channels: Mutex::new(HashMap::new()),
                operator: Box::new(operator),
                config,
                idle: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Enqueue `payload` on the channel `key`.
    ///
    /// On an idle channel the operator runs immediately on this call stack.
    /// Otherwise the payload is queued together with the ambient context
    /// active right now, and dispatched within it once its turn comes.
    pub fn enqueue(&self, key: K, payload: T) {
        self.submit(key, payload, None);
    }

    /// Enqueue `payload` on the channel `key`, dispatching it within
    /// `context` whether it runs immediately or later.
    pub fn enqueue_in(&self, key: K, payload: T, context: C) {
        self.submit(key, payload, Some(context));
    }

    fn submit(&self, key: K, payload: T, context: Option<C>) {
        // captured up front so no user code runs under the registry lock
        let captured = if context.is_none() && self.shared.config.capture_context {
            C::capture()
        } else {
            None
        };
        {
            let mut channels = self.shared.lock();
            if let Some(channel) = channels.get_mut(&key) {
                channel.pending.push_back(QueueEntry {
                    payload,
                    context: context.or(captured),
                });
                trace!(
                    queue = %self.shared.config.name,
                    key = ?key,
                    pending = channel.pending.len(),
                    "channel busy, entry queued"
                );
                return;
            }
            channels.insert(key.clone(), Channel::new());
        }
        self.shared.dispatch(key, QueueEntry { payload, context });
    }

    /// Returns true if no channel has queued or in-flight work.
    pub fn is_idle(&self) -> bool {
        self.shared.lock().is_empty()
    }

    /// Number of channels with queued or in-flight work.
    pub fn channel_count(&self) -> usize {
        self.shared.lock().len()
    }

    /// Returns true if `key` has queued or in-flight work.
    pub fn is_active(&self, key: &K) -> bool {
        self.shared.lock().contains_key(key)
    }

    /// Number of entries waiting on `key`, not counting the in-flight one.
    pub fn pending_len(&self, key: &K) -> usize {
        self.shared
            .lock()
            .get(key)
            .map_or(0, |channel| channel.pending.len())
    }

    /// Wait until every channel has drained.
    ///
    /// This does not stop the queue; new work enqueued afterwards is
    /// accepted as usual.
    pub async fn idle(&self) {
        loop {
            let mut notified = pin!(self.shared.idle.notified());
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl<K: Debug, T, C> Debug for KeyedSerialQueue<K, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self
            .shared
            .channels
            .lock()
            .map_or(0, |channels| channels.len());
        f.debug_struct("KeyedSerialQueue")
            .field("name", &self.shared.config.name)
            .field("channels", &channels)
            .finish()
    }
}
