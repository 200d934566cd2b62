//! Automatic recovery timers.
//!
//! One optional timer and an attempt counter per wallet. Timers are tokio
//! tasks that sleep for the reconnect interval and then run the supplied
//! recovery future. A timer that has fired removes itself from the table
//! before doing any work, so cancelling afterwards never aborts an attempt
//! already in progress.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::domain::{RecoveryOptions, WalletId};

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Entry {
    attempts: u32,
    timer: Option<Timer>,
}

#[derive(Default)]
struct Table {
    entries: HashMap<WalletId, Entry>,
    /// Set by [`RecoveryScheduler::close`]; no timer is armed afterwards.
    closed: bool,
}

/// Per-wallet recovery timers and attempt counters.
#[derive(Default)]
pub struct RecoveryScheduler {
    table: Mutex<Table>,
    next_generation: AtomicU64,
}

impl RecoveryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `fire(generation)` after `options.reconnect_interval`.
    ///
    /// Does nothing unless recovery is enabled and attempts remain. Any timer
    /// already pending for the wallet is replaced. Returns the attempt
    /// number that was scheduled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F, Fut>(&self, wallet_id: &WalletId, options: &RecoveryOptions, fire: F) -> Option<u32>
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut table = self.table.lock();
        if table.closed {
            return None;
        }

        let entry = table.entries.entry(wallet_id.clone()).or_default();
        if !options.allows_attempt(entry.attempts) {
            debug!(
                wallet = %wallet_id,
                attempts = entry.attempts,
                max = options.max_reconnect_attempts,
                "Recovery not armed"
            );
            return None;
        }

        if let Some(previous) = entry.timer.take() {
            previous.handle.abort();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let delay = options.reconnect_interval;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(generation).await;
        });

        entry.attempts += 1;
        entry.timer = Some(Timer { generation, handle });

        debug!(
            wallet = %wallet_id,
            attempt = entry.attempts,
            delay_ms = delay.as_millis() as u64,
            "Recovery armed"
        );
        Some(entry.attempts)
    }

    /// Called by a timer when it fires.
    ///
    /// Returns true if `generation` is still the wallet's current timer, in
    /// which case the timer is detached from the table without being aborted.
    pub fn take_fired(&self, wallet_id: &WalletId, generation: u64) -> bool {
        let mut table = self.table.lock();
        let Some(entry) = table.entries.get_mut(wallet_id) else {
            return false;
        };
        match &entry.timer {
            Some(timer) if timer.generation == generation => {
                entry.timer = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the wallet's pending timer, keeping its attempt count.
    ///
    /// Returns whether a timer was pending.
    pub fn disarm(&self, wallet_id: &WalletId) -> bool {
        let timer = self
            .table
            .lock()
            .entries
            .get_mut(wallet_id)
            .and_then(|entry| entry.timer.take());

        match timer {
            Some(timer) => {
                timer.handle.abort();
                debug!(wallet = %wallet_id, "Recovery disarmed");
                true
            }
            None => {
                trace!(wallet = %wallet_id, "No recovery timer to disarm");
                false
            }
        }
    }

    /// Cancel the wallet's timer and reset its attempt count.
    pub fn reset(&self, wallet_id: &WalletId) {
        let entry = self.table.lock().entries.remove(wallet_id);
        if let Some(timer) = entry.and_then(|e| e.timer) {
            timer.handle.abort();
            debug!(wallet = %wallet_id, "Recovery reset");
        }
    }

    #[must_use]
    pub fn is_armed(&self, wallet_id: &WalletId) -> bool {
        self.table
            .lock()
            .entries
            .get(wallet_id)
            .is_some_and(|entry| entry.timer.is_some())
    }

    #[must_use]
    pub fn attempts(&self, wallet_id: &WalletId) -> u32 {
        self.table
            .lock()
            .entries
            .get(wallet_id)
            .map_or(0, |entry| entry.attempts)
    }

    /// Number of timers currently pending across all wallets.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.table
            .lock()
            .entries
            .values()
            .filter(|entry| entry.timer.is_some())
            .count()
    }

    /// Cancel every timer and forget every counter.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut self.table.lock().entries);
        for (_, entry) in entries {
            if let Some(timer) = entry.timer {
                timer.handle.abort();
            }
        }
    }

    /// Cancel everything and refuse to arm from now on.
    pub fn close(&self) {
        self.table.lock().closed = true;
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::time::Duration;

    fn wallet() -> WalletId {
        WalletId::new("w1")
    }

    fn policy(max: u32) -> RecoveryOptions {
        RecoveryOptions::auto(Duration::from_millis(100), max)
    }

    /// Fire callback that counts invocations of still-current timers.
    fn counting(
        scheduler: &Arc<RecoveryScheduler>,
        fired: &Arc<AtomicU32>,
    ) -> impl FnOnce(u64) -> std::future::Ready<()> + Send + 'static {
        let scheduler = Arc::clone(scheduler);
        let fired = Arc::clone(fired);
        move |generation| {
            if scheduler.take_fired(&wallet(), generation) {
                fired.fetch_add(1, Ordering::SeqCst);
            }
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_interval() {
        let scheduler = Arc::new(RecoveryScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        assert_eq!(scheduler.arm(&wallet(), &policy(3), counting(&scheduler, &fired)), Some(1));
        assert!(scheduler.is_armed(&wallet()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed(&wallet()));
        assert_eq!(scheduler.attempts(&wallet()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_policy_never_arms() {
        let scheduler = Arc::new(RecoveryScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        let armed = scheduler.arm(
            &wallet(),
            &RecoveryOptions::disabled(),
            counting(&scheduler, &fired),
        );

        assert_eq!(armed, None);
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_stop_at_max() {
        let scheduler = Arc::new(RecoveryScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        for expected in 1..=2 {
            let armed = scheduler.arm(&wallet(), &policy(2), counting(&scheduler, &fired));
            assert_eq!(armed, Some(expected));
            tokio::time::sleep(Duration::from_millis(150)).await;
        }

        assert_eq!(scheduler.arm(&wallet(), &policy(2), counting(&scheduler, &fired)), None);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_prevents_firing() {
        let scheduler = Arc::new(RecoveryScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.arm(&wallet(), &policy(3), counting(&scheduler, &fired));
        assert!(scheduler.disarm(&wallet()));
        assert!(!scheduler.disarm(&wallet()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.attempts(&wallet()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_timer() {
        let scheduler = Arc::new(RecoveryScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.arm(&wallet(), &policy(3), counting(&scheduler, &fired));
        scheduler.arm(&wallet(), &policy(3), counting(&scheduler, &fired));
        assert_eq!(scheduler.armed_count(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_attempts() {
        let scheduler = Arc::new(RecoveryScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.arm(&wallet(), &policy(3), counting(&scheduler, &fired));
        scheduler.reset(&wallet());

        assert_eq!(scheduler.attempts(&wallet()), 0);
        assert!(!scheduler.is_armed(&wallet()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_and_refuses_new_timers() {
        let scheduler = Arc::new(RecoveryScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.arm(&wallet(), &policy(3), counting(&scheduler, &fired));
        scheduler.close();
        scheduler.close();

        assert_eq!(scheduler.armed_count(), 0);
        assert_eq!(scheduler.arm(&wallet(), &policy(3), counting(&scheduler, &fired)), None);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_generation_is_rejected() {
        let scheduler = RecoveryScheduler::new();
        assert!(!scheduler.take_fired(&wallet(), 42));
    }
}
