//! Wallet connection domain types.
//!
//! Pure data: identifiers, the per-wallet connection record and recovery
//! policy. Nothing here performs I/O or owns a lock.

pub mod connection;
pub mod id;
pub mod recovery;

pub use connection::{
    ConnectOptions, ConnectResult, ConnectionError, ConnectionState, ConnectionStatus, Transport,
};
pub use id::{SessionId, WalletId};
pub use recovery::RecoveryOptions;
