//! Replay-latest observable values
//!
//! A [`Publisher`] owns a latest-value slot and is the only handle that can
//! write to it. Any number of [`Observable`] read handles can be cloned from
//! it. Readers see the current value immediately and every later value in
//! publish order.
//!
//! # Architecture
//!
//! The slot sits behind a mutex next to a `tokio::sync::broadcast` sender.
//! Publishing replaces the value and broadcasts it under the same lock, and
//! subscribing snapshots the value and opens a receiver under that lock too,
//! so a new reader never misses or duplicates a value.
//!
//! # Example
//!
//! ```
//! use libcinesearch::observable::Publisher;
//!
//! # async fn example() {
//! let publisher = Publisher::new(0u32);
//! let mut watcher = publisher.observable().watch();
//!
//! publisher.publish(1);
//!
//! assert_eq!(watcher.next().await, Some(0));
//! assert_eq!(watcher.next().await, Some(1));
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{Result, SearchError};

/// Number of values buffered per watcher before a slow watcher starts lagging
pub const DEFAULT_CAPACITY: usize = 64;

struct Slot<T> {
    value: T,
    // None once the publisher is gone
    sender: Option<broadcast::Sender<T>>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-writer handle to an observable value
///
/// Not `Clone`: there is exactly one writer per value. Dropping the publisher
/// completes every watcher once it has drained the values already sent.
pub struct Publisher<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> Publisher<T> {
    /// Create a publisher holding `initial`
    pub fn new(initial: T) -> Self {
        Self::with_capacity(initial, DEFAULT_CAPACITY)
    }

    /// Create a publisher with a custom per-watcher buffer
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(initial: T, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    value: initial,
                    sender: Some(sender),
                }),
            }),
        }
    }

    /// Replace the current value and notify every watcher
    pub fn publish(&self, value: T) {
        let mut slot = self.shared.lock();
        slot.value = value.clone();
        if let Some(sender) = &slot.sender {
            // Err only means nobody is watching right now
            let _ = sender.send(value);
        }
    }

    /// Latest published value
    pub fn get(&self) -> T {
        self.shared.lock().value.clone()
    }

    /// Read handle for this value
    pub fn observable(&self) -> Observable<T> {
        Observable {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        self.shared.lock().sender = None;
    }
}

/// Cloneable read handle to an observable value
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> Observable<T> {
    /// Latest published value
    pub fn get(&self) -> T {
        self.shared.lock().value.clone()
    }

    /// Whether the publisher has been dropped
    pub fn is_closed(&self) -> bool {
        self.shared.lock().sender.is_none()
    }

    /// Watch this value, starting with the current one
    pub fn watch(&self) -> Watcher<T> {
        let (current, mut watcher) = self.snapshot();
        watcher.pending = Some(current);
        watcher
    }

    /// Current value plus a watcher that yields only values published after it
    ///
    /// Both are taken under the slot lock, so nothing published concurrently
    /// can fall between the snapshot and the first change.
    pub fn snapshot(&self) -> (T, Watcher<T>) {
        let slot = self.shared.lock();
        let receiver = match &slot.sender {
            Some(sender) => sender.subscribe(),
            None => closed_receiver(),
        };
        (
            slot.value.clone(),
            Watcher {
                pending: None,
                receiver,
            },
        )
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    /// Deliver the current value and every later value to `callback`
    ///
    /// Deliveries run one at a time on a single task, which is the consumer
    /// context for this subscription. Releasing the returned handle (or
    /// dropping it) guarantees that no delivery starts afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::NoRuntime` when called outside a tokio runtime.
    pub fn subscribe<F>(&self, mut callback: F) -> Result<Subscription>
    where
        F: FnMut(T) + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| SearchError::NoRuntime)?;

        let mut watcher = self.watch();
        let active = Arc::new(Mutex::new(true));
        let gate = Arc::clone(&active);

        let task = handle.spawn(async move {
            while let Some(value) = watcher.next().await {
                let active = gate.lock().unwrap_or_else(PoisonError::into_inner);
                if !*active {
                    break;
                }
                callback(value);
            }
        });

        Ok(Subscription {
            active,
            task: Some(task),
        })
    }
}

fn closed_receiver<T: Clone>() -> broadcast::Receiver<T> {
    let (sender, receiver) = broadcast::channel(1);
    drop(sender);
    receiver
}

/// Stream of values from an [`Observable`]
pub struct Watcher<T> {
    pending: Option<T>,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> Watcher<T> {
    /// Next value, or `None` once the publisher is gone and all values are drained
    ///
    /// A watcher that falls more than the buffer capacity behind skips the
    /// oldest values it missed and continues with the oldest one still buffered.
    /// This method is cancel safe.
    pub async fn next(&mut self) -> Option<T> {
        if let Some(value) = self.pending.take() {
            return Some(value);
        }

        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Observable watcher lagged, skipped {} values", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Handle to a callback subscription
///
/// The callback stays registered for as long as this handle is held.
pub struct Subscription {
    active: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop deliveries
    ///
    /// A delivery already running finishes before this returns; none start
    /// after it.
    pub fn release(mut self) {
        self.stop();
    }

    /// Whether the subscription is still delivering
    pub fn is_active(&self) -> bool {
        let active = *self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop(&mut self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}
