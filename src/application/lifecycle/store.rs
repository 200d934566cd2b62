//! In-memory connection records keyed by wallet.

use std::collections::HashMap;

use dashmap::DashMap;

use crate::domain::{ConnectionState, ConnectionStatus, WalletId};

/// Holds the current [`ConnectionState`] of every wallet touched so far.
///
/// Records are created on first write with the `disconnected` default.
/// Reads always hand out clones.
#[derive(Default)]
pub struct ConnectionStore {
    records: DashMap<WalletId, ConnectionState>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to the wallet's record, creating it first if needed, and
    /// return a snapshot of the result.
    pub fn update<F>(&self, wallet_id: &WalletId, f: F) -> ConnectionState
    where
        F: FnOnce(&mut ConnectionState),
    {
        let mut record = self
            .records
            .entry(wallet_id.clone())
            .or_insert_with(|| ConnectionState::new(wallet_id.clone()));
        f(record.value_mut());
        record.value().clone()
    }

    #[must_use]
    pub fn get(&self, wallet_id: &WalletId) -> Option<ConnectionState> {
        self.records.get(wallet_id).map(|r| r.value().clone())
    }

    /// Status of the wallet, `disconnected` if it has no record yet.
    #[must_use]
    pub fn status(&self, wallet_id: &WalletId) -> ConnectionStatus {
        self.records
            .get(wallet_id)
            .map_or(ConnectionStatus::default(), |r| r.status)
    }

    #[must_use]
    pub fn snapshot(&self) -> HashMap<WalletId, ConnectionState> {
        self.records
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}
