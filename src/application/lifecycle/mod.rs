//! Wallet connection lifecycle.
//!
//! [`ConnectionManager`] is the entry point. The remaining modules are its
//! building blocks and are public so callers can reuse them directly:
//!
//! - [`lock`] - per-key FIFO mutual exclusion
//! - [`store`] - connection records
//! - [`scheduler`] - automatic recovery timers and attempt counters
//! - [`events`] - state-change subscriptions

pub mod events;
pub mod lock;
mod manager;
pub mod scheduler;
pub mod store;

pub use events::{EventRegistry, StateHandler, Subscription};
pub use lock::KeyedLock;
pub use manager::ConnectionManager;
pub use scheduler::RecoveryScheduler;
pub use store::ConnectionStore;
