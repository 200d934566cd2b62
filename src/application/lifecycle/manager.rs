//! Connection lifecycle manager.
//!
//! Every mutating operation on a wallet (connect, disconnect, manual or
//! automatic recovery) runs under that wallet's [`KeyedLock`] slot, taken
//! at call time. The record therefore always reflects the last operation in
//! submission order, and automatic recovery can never race a manual request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::{self, Either};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{EventRegistry, StateHandler, Subscription};
use super::lock::KeyedLock;
use super::scheduler::RecoveryScheduler;
use super::store::ConnectionStore;
use crate::domain::{
    ConnectOptions, ConnectResult, ConnectionError, ConnectionState, ConnectionStatus,
    RecoveryOptions, WalletId,
};
use crate::error::{Error, Result};
use crate::infrastructure::config::Config;
use crate::port::SharedAdapter;

/// How an attempt entered the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Connect,
    Recover,
}

impl Attempt {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Recover => "recover",
        }
    }
}

/// Owns the connection records, locks, timers and recovery options of a set
/// of wallets.
///
/// Cloning is cheap and yields a handle to the same manager. Separate
/// instances share nothing.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    instance_id: Uuid,
    store: ConnectionStore,
    locks: KeyedLock<WalletId>,
    scheduler: RecoveryScheduler,
    options: DashMap<WalletId, RecoveryOptions>,
    defaults: RecoveryOptions,
    events: Arc<EventRegistry>,
    destroyed: AtomicBool,
}

impl ConnectionManager {
    /// Create a manager using [`RecoveryOptions::default`] for wallets
    /// without explicit options.
    pub fn new() -> Self {
        Self::with_defaults(RecoveryOptions::default())
    }

    /// Create a manager whose default recovery policy comes from `config`.
    pub fn with_config(config: &Config) -> Self {
        Self::with_defaults(config.recovery.to_options())
    }

    pub fn with_defaults(defaults: RecoveryOptions) -> Self {
        let (defaults, clamped) = defaults.clamped();
        let instance_id = Uuid::new_v4();
        if clamped {
            warn!(
                manager = %instance_id,
                interval_ms = defaults.reconnect_interval.as_millis() as u64,
                "Default reconnect interval out of range, clamped"
            );
        }
        debug!(manager = %instance_id, "Connection manager created");

        Self {
            inner: Arc::new(Inner {
                instance_id,
                store: ConnectionStore::new(),
                locks: KeyedLock::new(),
                scheduler: RecoveryScheduler::new(),
                options: DashMap::new(),
                defaults,
                events: Arc::new(EventRegistry::new()),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.inner.instance_id
    }

    /// Connect `wallet_id` through `adapter`.
    ///
    /// Queues behind any operation already running or queued for the wallet.
    /// On failure the record moves to `error` and the adapter's error is
    /// returned. Automatic recovery is armed if the wallet's policy allows it
    /// and the error is recoverable; a [`UserRejected`] failure never is.
    ///
    /// Once polled, the operation runs on its own task: dropping the returned
    /// future stops waiting for it but does not abort the adapter call, and
    /// the record still receives the outcome. A future dropped before its
    /// first poll never runs.
    ///
    /// [`UserRejected`]: crate::error::ErrorCode::UserRejected
    ///
    /// # Errors
    ///
    /// Returns the adapter's error, or [`Error::Destroyed`] once the manager
    /// has been destroyed.
    pub fn connect(
        &self,
        wallet_id: WalletId,
        adapter: SharedAdapter,
        options: ConnectOptions,
    ) -> impl Future<Output = Result<ConnectResult>> + Send + 'static {
        if self.inner.is_destroyed() {
            return Either::Left(future::ready(Err(Error::Destroyed)));
        }

        let inner = Arc::clone(&self.inner);
        let wallet = wallet_id.clone();
        Either::Right(detach(self.inner.locks.with_lock(wallet_id, move || async move {
            inner.attempt(&wallet, &adapter, &options, Attempt::Connect).await
        })))
    }

    /// Disconnect `wallet_id` through `adapter`.
    ///
    /// Cancels pending automatic recovery, both now and again once the lock
    /// is held, then waits for any earlier operation on the wallet. The
    /// record ends `disconnected` even when the adapter fails. Runs to
    /// completion once polled, like [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns the adapter's error, or [`Error::Destroyed`] once the manager
    /// has been destroyed.
    pub fn disconnect(
        &self,
        wallet_id: WalletId,
        adapter: SharedAdapter,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        if self.inner.is_destroyed() {
            return Either::Left(future::ready(Err(Error::Destroyed)));
        }

        self.inner.scheduler.reset(&wallet_id);

        let inner = Arc::clone(&self.inner);
        let wallet = wallet_id.clone();
        Either::Right(detach(self.inner.locks.with_lock(wallet_id, move || async move {
            inner.run_disconnect(&wallet, &adapter).await
        })))
    }

    /// Reconnect `wallet_id` on the caller's request.
    ///
    /// Any pending automatic timer is cancelled immediately. The attempt then
    /// queues behind whatever is running for the wallet and always proceeds
    /// once it holds the lock. Failures re-arm recovery under the same rules
    /// as [`connect`](Self::connect), and cancellation behaves the same way.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error, or [`Error::Destroyed`] once the manager
    /// has been destroyed.
    pub fn start_manual_recovery(
        &self,
        wallet_id: WalletId,
        adapter: SharedAdapter,
        options: ConnectOptions,
    ) -> impl Future<Output = Result<ConnectResult>> + Send + 'static {
        if self.inner.is_destroyed() {
            return Either::Left(future::ready(Err(Error::Destroyed)));
        }

        self.inner.scheduler.disarm(&wallet_id);
        info!(manager = %self.inner.instance_id, wallet = %wallet_id, "Manual recovery requested");

        let inner = Arc::clone(&self.inner);
        let wallet = wallet_id.clone();
        Either::Right(detach(self.inner.locks.with_lock(wallet_id, move || async move {
            inner.attempt(&wallet, &adapter, &options, Attempt::Recover).await
        })))
    }

    /// Replace the wallet's recovery policy.
    ///
    /// Out-of-range intervals are clamped. A policy that disables recovery
    /// cancels any pending timer immediately.
    pub fn set_recovery_options(&self, wallet_id: impl Into<WalletId>, options: RecoveryOptions) {
        let wallet_id = wallet_id.into();
        if self.inner.is_destroyed() {
            debug!(wallet = %wallet_id, "Ignoring recovery options on destroyed manager");
            return;
        }
        self.inner.store_options(&wallet_id, options);
    }

    /// The wallet's recovery policy, or the manager default if none was set.
    #[must_use]
    pub fn recovery_options(&self, wallet_id: &WalletId) -> RecoveryOptions {
        self.inner.recovery_options(wallet_id)
    }

    #[must_use]
    pub fn get_connection_state(&self, wallet_id: &WalletId) -> Option<ConnectionState> {
        self.inner.store.get(wallet_id)
    }

    #[must_use]
    pub fn get_all_connection_states(&self) -> HashMap<WalletId, ConnectionState> {
        self.inner.store.snapshot()
    }

    #[must_use]
    pub fn is_connected(&self, wallet_id: &WalletId) -> bool {
        self.inner.store.status(wallet_id) == ConnectionStatus::Connected
    }

    /// True while an automatic recovery timer is pending for the wallet.
    #[must_use]
    pub fn pending_recovery(&self, wallet_id: &WalletId) -> bool {
        self.inner.scheduler.is_armed(wallet_id)
    }

    /// Automatic attempts scheduled since the wallet last connected.
    #[must_use]
    pub fn recovery_attempts(&self, wallet_id: &WalletId) -> u32 {
        self.inner.scheduler.attempts(wallet_id)
    }

    /// Pending recovery timers across all wallets.
    #[must_use]
    pub fn pending_timer_count(&self) -> usize {
        self.inner.scheduler.armed_count()
    }

    /// True while any operation on the wallet is running or queued.
    #[must_use]
    pub fn is_busy(&self, wallet_id: &WalletId) -> bool {
        self.inner.locks.is_locked(wallet_id)
    }

    /// Receive a snapshot after every state change of `wallet`, or of every
    /// wallet when `None`.
    pub fn subscribe<F>(&self, wallet: Option<WalletId>, handler: F) -> Subscription
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        let handler: StateHandler = Arc::new(handler);
        self.inner.events.subscribe(wallet, handler)
    }

    /// Tear the manager down.
    ///
    /// Cancels every timer, forgets every lock queue, record, policy and
    /// subscriber. Operations already running finish on their own but no
    /// longer touch any state. Safe to call repeatedly.
    pub fn destroy(&self) {
        let first = !self.inner.destroyed.swap(true, Ordering::SeqCst);
        self.inner.scheduler.close();
        self.inner.locks.clear();
        self.inner.store.clear();
        self.inner.options.clear();
        self.inner.events.clear();

        if first {
            info!(manager = %self.inner.instance_id, "Connection manager destroyed");
        } else {
            debug!(manager = %self.inner.instance_id, "Connection manager already destroyed");
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn recovery_options(&self, wallet_id: &WalletId) -> RecoveryOptions {
        self.options
            .get(wallet_id)
            .map_or(self.defaults, |options| *options)
    }

    fn store_options(&self, wallet_id: &WalletId, options: RecoveryOptions) {
        let (options, clamped) = options.clamped();
        if clamped {
            warn!(
                wallet = %wallet_id,
                interval_ms = options.reconnect_interval.as_millis() as u64,
                "Reconnect interval out of range, clamped"
            );
        }
        self.options.insert(wallet_id.clone(), options);
        if !options.is_enabled() {
            self.scheduler.disarm(wallet_id);
        }
    }

    /// Mutate the record and tell subscribers. No-op once destroyed.
    fn record<F>(&self, wallet_id: &WalletId, f: F)
    where
        F: FnOnce(&mut ConnectionState),
    {
        if self.is_destroyed() {
            return;
        }
        let snapshot = self.store.update(wallet_id, f);
        self.events.notify(&snapshot);
    }

    /// Run one connect or recovery attempt. Caller holds the wallet's lock.
    async fn attempt(
        self: &Arc<Self>,
        wallet_id: &WalletId,
        adapter: &SharedAdapter,
        options: &ConnectOptions,
        kind: Attempt,
    ) -> Result<ConnectResult> {
        if self.is_destroyed() {
            return Err(Error::Destroyed);
        }
        if let Some(recovery) = options.recovery {
            self.store_options(wallet_id, recovery);
        }

        self.record(wallet_id, |state| match kind {
            Attempt::Connect => state.begin_connect(options),
            Attempt::Recover => state.begin_recovery(options),
        });
        debug!(
            manager = %self.instance_id,
            wallet = %wallet_id,
            adapter = adapter.name(),
            kind = kind.as_str(),
            "Calling adapter connect"
        );

        let result = adapter.connect().await;

        if self.is_destroyed() {
            debug!(wallet = %wallet_id, "Attempt finished after destroy, discarding");
            return result.map_err(Error::from);
        }

        match result {
            Ok(connected) => {
                self.scheduler.reset(wallet_id);
                let session_id = connected.session_id.clone();
                self.record(wallet_id, |state| state.mark_connected(session_id, Utc::now()));
                info!(
                    manager = %self.instance_id,
                    wallet = %wallet_id,
                    adapter = adapter.name(),
                    kind = kind.as_str(),
                    session = %connected.session_id,
                    "Wallet connected"
                );
                Ok(connected)
            }
            Err(err) => {
                self.record(wallet_id, |state| state.mark_failed(ConnectionError::from(&err)));
                warn!(
                    manager = %self.instance_id,
                    wallet = %wallet_id,
                    adapter = adapter.name(),
                    kind = kind.as_str(),
                    error = %err,
                    "Wallet connection failed"
                );
                if err.recoverable {
                    self.schedule_recovery(wallet_id, adapter, options);
                }
                Err(err.into())
            }
        }
    }

    async fn run_disconnect(&self, wallet_id: &WalletId, adapter: &SharedAdapter) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::Destroyed);
        }
        self.scheduler.reset(wallet_id);

        let result = adapter.disconnect().await;
        self.record(wallet_id, ConnectionState::mark_disconnected);

        match &result {
            Ok(()) => info!(
                manager = %self.instance_id,
                wallet = %wallet_id,
                adapter = adapter.name(),
                "Wallet disconnected"
            ),
            Err(err) => warn!(
                manager = %self.instance_id,
                wallet = %wallet_id,
                adapter = adapter.name(),
                error = %err,
                "Adapter disconnect failed, wallet marked disconnected"
            ),
        }
        result.map_err(Error::from)
    }

    fn schedule_recovery(self: &Arc<Self>, wallet_id: &WalletId, adapter: &SharedAdapter, options: &ConnectOptions) {
        let policy = self.recovery_options(wallet_id);
        let weak = Arc::downgrade(self);
        let wallet = wallet_id.clone();
        let adapter = Arc::clone(adapter);
        let options = ConnectOptions {
            recovery: None,
            ..options.clone()
        };

        let armed = self.scheduler.arm(wallet_id, &policy, move |generation| {
            fire_recovery(weak, wallet, adapter, options, generation)
        });
        if let Some(attempt) = armed {
            info!(
                manager = %self.instance_id,
                wallet = %wallet_id,
                attempt,
                max = policy.max_reconnect_attempts,
                delay_ms = policy.reconnect_interval.as_millis() as u64,
                "Automatic recovery scheduled"
            );
        }
    }

    /// Whether a fired automatic attempt still has a reason to run.
    ///
    /// Checked after acquiring the lock: anything that ran in between
    /// (a disconnect, a successful manual recovery, a newer timer, a policy
    /// change) supersedes it.
    fn wants_automatic_attempt(&self, wallet_id: &WalletId) -> bool {
        !self.is_destroyed()
            && self.store.status(wallet_id) == ConnectionStatus::Error
            && self.recovery_options(wallet_id).is_enabled()
            && !self.scheduler.is_armed(wallet_id)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.scheduler.close();
    }
}

/// Run a locked operation on its own task so a caller that stops waiting
/// cannot abort it halfway. Spawning happens on first poll.
async fn detach<T>(op: impl Future<Output = Result<T>> + Send + 'static) -> Result<T>
where
    T: Send + 'static,
{
    match tokio::spawn(op).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => Err(Error::Cancelled),
    }
}

/// Body of an automatic recovery timer once its interval has elapsed.
async fn fire_recovery(
    inner: Weak<Inner>,
    wallet_id: WalletId,
    adapter: SharedAdapter,
    options: ConnectOptions,
    generation: u64,
) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    if !inner.scheduler.take_fired(&wallet_id, generation) {
        debug!(wallet = %wallet_id, generation, "Stale recovery timer, skipping");
        return;
    }

    let runner = Arc::clone(&inner);
    let wallet = wallet_id.clone();
    let outcome = inner
        .locks
        .with_lock(wallet_id.clone(), move || async move {
            if !runner.wants_automatic_attempt(&wallet) {
                return None;
            }
            Some(runner.attempt(&wallet, &adapter, &options, Attempt::Recover).await)
        })
        .await;

    match outcome {
        None => debug!(wallet = %wallet_id, "Automatic recovery superseded"),
        Some(Ok(_)) => info!(wallet = %wallet_id, "Automatic recovery succeeded"),
        Some(Err(err)) => debug!(wallet = %wallet_id, error = %err, "Automatic recovery attempt failed"),
    }
}
