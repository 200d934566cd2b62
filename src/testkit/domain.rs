//! Builders for domain primitives.

use crate::domain::{ConnectOptions, RecoveryOptions, WalletId};
use crate::error::AdapterError;

pub fn wallet(id: &str) -> WalletId {
    WalletId::new(id)
}

/// Connect options that install `recovery` as the wallet's policy.
pub fn with_recovery(recovery: RecoveryOptions) -> ConnectOptions {
    ConnectOptions::default().with_recovery(recovery)
}

/// A transient failure that arms automatic recovery.
pub fn offline() -> AdapterError {
    AdapterError::connection_failed("wallet offline")
}

/// A failure that never arms automatic recovery.
pub fn rejected() -> AdapterError {
    AdapterError::user_rejected("user closed the prompt")
}
