//! State-change subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::domain::{ConnectionState, WalletId};

/// Callback invoked with a snapshot after every state change.
pub type StateHandler = Arc<dyn Fn(&ConnectionState) + Send + Sync>;

struct Entry {
    id: u64,
    wallet: Option<WalletId>,
    handler: StateHandler,
}

/// Ordered list of state-change handlers.
///
/// Handlers run synchronously, in registration order, on the task that
/// performed the mutation. The list is not locked while they run, so a
/// handler may subscribe or unsubscribe.
#[derive(Default)]
pub struct EventRegistry {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for one wallet, or for every wallet when `wallet`
    /// is `None`.
    pub fn subscribe(self: &Arc<Self>, wallet: Option<WalletId>, handler: StateHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(Entry {
            id,
            wallet,
            handler,
        });
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    /// Deliver `state` to every matching handler.
    pub fn notify(&self, state: &ConnectionState) {
        let handlers: Vec<StateHandler> = self
            .entries
            .read()
            .iter()
            .filter(|entry| {
                entry
                    .wallet
                    .as_ref()
                    .map_or(true, |wallet| *wallet == state.wallet_id)
            })
            .map(|entry| Arc::clone(&entry.handler))
            .collect();

        for handler in handlers {
            handler(state);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it keeps the handler registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<EventRegistry>,
}

impl Subscription {
    /// Remove the handler. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}
