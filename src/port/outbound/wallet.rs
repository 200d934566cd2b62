//! Wallet adapter port.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ConnectResult;
use crate::error::AdapterError;

/// Performs the I/O needed to open and close a session with one wallet.
///
/// Any rejection is treated uniformly as a failed connect or disconnect.
/// Implementations must tolerate being called repeatedly; the manager never
/// coalesces requests.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Open a session with the wallet.
    async fn connect(&self) -> Result<ConnectResult, AdapterError>;

    /// Close the current session.
    async fn disconnect(&self) -> Result<(), AdapterError>;

    /// Human-readable adapter name for logs.
    fn name(&self) -> &str {
        "wallet"
    }
}

/// Adapter handle shared between a caller and the recovery scheduler.
pub type SharedAdapter = Arc<dyn WalletAdapter>;
