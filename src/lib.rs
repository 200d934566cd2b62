//! Walletlink - per-wallet connection lifecycle management.
//!
//! Tracks the connection state of many wallets at once, serializes every
//! operation on the same wallet, and optionally retries failed connections
//! on a timer.
//!
//! # Architecture
//!
//! - **`domain`** - Connection records, identifiers and recovery policy
//! - **`port`** - The [`WalletAdapter`](port::WalletAdapter) trait wallets implement
//! - **`application::lifecycle`** - [`ConnectionManager`] and its building blocks:
//!   keyed FIFO lock, record store, recovery scheduler, subscriptions
//! - **`infrastructure::config`** - TOML configuration and tracing setup
//!
//! # Features
//!
//! - `testkit` - Expose [`testkit`] (scripted adapters, canonical configs)
//!   to integration tests
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use walletlink::domain::{ConnectOptions, WalletId};
//! use walletlink::port::SharedAdapter;
//! use walletlink::ConnectionManager;
//!
//! async fn run(adapter: SharedAdapter) -> walletlink::Result<()> {
//!     let manager = ConnectionManager::new();
//!     let wallet = WalletId::new("phantom");
//!
//!     let result = manager
//!         .connect(wallet.clone(), Arc::clone(&adapter), ConnectOptions::default())
//!         .await?;
//!     println!("session {}", result.session_id);
//!
//!     manager.disconnect(wallet, adapter).await?;
//!     manager.destroy();
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use application::lifecycle::{ConnectionManager, Subscription};
pub use error::{AdapterError, Error, ErrorCode, Result};
