//! Keyed FIFO mutex.
//!
//! Each key owns a chain of one-shot release signals. Calling
//! [`KeyedLock::with_lock`] synchronously swaps itself in as the new tail of
//! the chain, so queue position is fixed at call time rather than at first
//! poll. The returned future waits for its predecessor's signal, runs the
//! operation and fires its own signal on drop.
//!
//! Dropping a reservation that is still waiting does not let its successor
//! jump the queue: the wait on the predecessor is handed to a detached task
//! (or, outside a Tokio runtime, a short-lived thread) that forwards the
//! release once the predecessor finishes.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{trace, warn};

/// Tail of one key's queue.
struct Slot {
    /// Ticket of the most recent reservation.
    ticket: u64,
    /// Fires when the most recent reservation releases.
    released: oneshot::Receiver<()>,
    /// Reservations running or waiting on this key.
    holders: usize,
}

struct Table<K> {
    /// Bumped by [`KeyedLock::clear`]; releases from older epochs skip bookkeeping.
    epoch: u64,
    slots: HashMap<K, Slot>,
}

/// Per-key FIFO mutual exclusion for async operations.
///
/// Operations on the same key run one at a time in call order. Operations
/// on different keys never wait for each other.
pub struct KeyedLock<K> {
    table: Arc<Mutex<Table<K>>>,
    next_ticket: AtomicU64,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                epoch: 0,
                slots: HashMap::new(),
            })),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Run `op` once every earlier operation on `key` has finished.
    ///
    /// The queue position is taken when this method is called. The lock is
    /// released when `op` completes, fails, panics or the returned future is
    /// dropped.
    pub fn with_lock<F, Fut>(&self, key: K, op: F) -> impl Future<Output = Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let reservation = self.reserve(key);
        async move {
            let _guard = reservation.acquire().await;
            op().await
        }
    }

    /// Take a place at the back of `key`'s queue.
    pub fn reserve(&self, key: K) -> Reservation<K> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (signal, released) = oneshot::channel();

        let mut table = self.table.lock();
        let epoch = table.epoch;
        let prev = match table.slots.get_mut(&key) {
            Some(slot) => {
                slot.ticket = ticket;
                slot.holders += 1;
                Some(std::mem::replace(&mut slot.released, released))
            }
            None => {
                table.slots.insert(
                    key.clone(),
                    Slot {
                        ticket,
                        released,
                        holders: 1,
                    },
                );
                None
            }
        };
        drop(table);

        trace!(key = ?key, ticket, queued = prev.is_some(), "Lock reserved");

        Reservation {
            prev,
            release: Some(Release {
                table: Arc::clone(&self.table),
                key,
                ticket,
                epoch,
                signal: Some(signal),
            }),
        }
    }

    /// True while any operation on `key` is running or waiting.
    #[must_use]
    pub fn is_locked(&self, key: &K) -> bool {
        self.table.lock().slots.contains_key(key)
    }

    /// Number of operations on `key` running or waiting.
    #[must_use]
    pub fn queue_len(&self, key: &K) -> usize {
        self.table
            .lock()
            .slots
            .get(key)
            .map_or(0, |slot| slot.holders)
    }

    /// Forget every queue.
    ///
    /// Operations already holding or waiting keep their place in the old
    /// chains and release harmlessly; new calls start fresh chains.
    pub fn clear(&self) {
        let mut table = self.table.lock();
        table.epoch += 1;
        table.slots.clear();
    }
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A place in a key's queue that has not been granted yet.
pub struct Reservation<K: Eq + Hash + Debug + Send + 'static> {
    prev: Option<oneshot::Receiver<()>>,
    release: Option<Release<K>>,
}

impl<K: Eq + Hash + Debug + Send + 'static> Reservation<K> {
    /// Wait until every earlier reservation on the key has released.
    pub async fn acquire(mut self) -> LockGuard<K> {
        if let Some(prev) = self.prev.as_mut() {
            // A dropped sender means the predecessor released as well.
            let _ = prev.await;
        }
        self.prev = None;
        LockGuard {
            _release: self.release.take(),
        }
    }
}

impl<K: Eq + Hash + Debug + Send + 'static> Drop for Reservation<K> {
    fn drop(&mut self) {
        let (Some(prev), Some(release)) = (self.prev.take(), self.release.take()) else {
            return;
        };

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = prev.await;
                drop(release);
            });
            return;
        }

        // Outside a runtime, park a thread on the predecessor instead.
        let key = format!("{:?}", release.key);
        let spawned = std::thread::Builder::new()
            .name("keyed-lock-forward".into())
            .spawn(move || {
                let _ = prev.blocking_recv();
                drop(release);
            });
        if let Err(err) = spawned {
            warn!(key = %key, error = %err, "Failed to forward abandoned lock reservation, released early");
        }
    }
}

/// Held while an operation owns the key. Releases on drop.
pub struct LockGuard<K: Eq + Hash + Debug + Send + 'static> {
    _release: Option<Release<K>>,
}

struct Release<K: Eq + Hash + Debug + Send + 'static> {
    table: Arc<Mutex<Table<K>>>,
    key: K,
    ticket: u64,
    epoch: u64,
    signal: Option<oneshot::Sender<()>>,
}

impl<K: Eq + Hash + Debug + Send + 'static> Drop for Release<K> {
    fn drop(&mut self) {
        {
            let mut table = self.table.lock();
            if table.epoch == self.epoch {
                let last = match table.slots.get_mut(&self.key) {
                    Some(slot) => {
                        slot.holders = slot.holders.saturating_sub(1);
                        slot.ticket == self.ticket
                    }
                    None => false,
                };
                if last {
                    table.slots.remove(&self.key);
                }
            }
        }

        if let Some(signal) = self.signal.take() {
            let _ = signal.send(());
        }
        trace!(key = ?self.key, ticket = self.ticket, "Lock released");
    }
}
