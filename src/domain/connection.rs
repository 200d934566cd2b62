//! Per-wallet connection record.
//!
//! [`ConnectionState`] is only mutated through its transition methods, which
//! keep `status`, `session_id` and `error` consistent with each other.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{SessionId, WalletId};
use super::recovery::RecoveryOptions;
use crate::error::{AdapterError, ErrorCode};

/// Lifecycle status of a single wallet connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
    Recovering,
}

impl ConnectionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Recovering => "recovering",
        }
    }

    /// True while an adapter call is outstanding.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Connecting | Self::Recovering)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the adapter reaches the wallet. Forwarded, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Extension,
    Injected,
    Popup,
    WebSocket,
}

/// Structured failure stored on a record in the `error` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl From<&AdapterError> for ConnectionError {
    fn from(err: &AdapterError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            recoverable: err.recoverable,
        }
    }
}

/// Payload a wallet returns from a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResult {
    pub session_id: SessionId,
    #[serde(default)]
    pub accounts: Vec<String>,
}

impl ConnectResult {
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            accounts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = accounts;
        self
    }
}

/// Per-call options for `connect` and manual recovery.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Discovery-layer description of the wallet.
    pub qualified_wallet: Option<serde_json::Value>,
    pub transport: Option<Transport>,
    /// Stored as the wallet's recovery options before the attempt runs.
    pub recovery: Option<RecoveryOptions>,
}

impl ConnectOptions {
    #[must_use]
    pub fn with_qualified_wallet(mut self, wallet: serde_json::Value) -> Self {
        self.qualified_wallet = Some(wallet);
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_recovery(mut self, recovery: RecoveryOptions) -> Self {
        self.recovery = Some(recovery);
        self
    }
}

/// Current connection record of one wallet.
///
/// `session_id` and `connected_at` are set only when connected, `error` only
/// in the error status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub wallet_id: WalletId,
    pub status: ConnectionStatus,
    pub session_id: Option<SessionId>,
    pub connected_at: Option<DateTime<Utc>>,
    pub error: Option<ConnectionError>,
    pub qualified_wallet: Option<serde_json::Value>,
    pub transport: Option<Transport>,
}

impl ConnectionState {
    /// A fresh record in the `disconnected` status.
    pub fn new(wallet_id: WalletId) -> Self {
        Self {
            wallet_id,
            status: ConnectionStatus::Disconnected,
            session_id: None,
            connected_at: None,
            error: None,
            qualified_wallet: None,
            transport: None,
        }
    }

    /// Enter `connecting`, adopting any opaque references the caller supplied.
    pub fn begin_connect(&mut self, options: &ConnectOptions) {
        if options.qualified_wallet.is_some() {
            self.qualified_wallet = options.qualified_wallet.clone();
        }
        if options.transport.is_some() {
            self.transport = options.transport;
        }
        self.enter(ConnectionStatus::Connecting);
    }

    /// Enter `recovering`.
    pub fn begin_recovery(&mut self, options: &ConnectOptions) {
        if options.qualified_wallet.is_some() {
            self.qualified_wallet = options.qualified_wallet.clone();
        }
        if options.transport.is_some() {
            self.transport = options.transport;
        }
        self.enter(ConnectionStatus::Recovering);
    }

    pub fn mark_connected(&mut self, session_id: SessionId, at: DateTime<Utc>) {
        self.enter(ConnectionStatus::Connected);
        self.session_id = Some(session_id);
        self.connected_at = Some(at);
    }

    pub fn mark_failed(&mut self, error: ConnectionError) {
        self.enter(ConnectionStatus::Error);
        self.error = Some(error);
    }

    pub fn mark_disconnected(&mut self) {
        self.enter(ConnectionStatus::Disconnected);
    }

    /// Switch status and drop every status-dependent field.
    fn enter(&mut self, status: ConnectionStatus) {
        self.status = status;
        self.session_id = None;
        self.connected_at = None;
        self.error = None;
    }

    /// Whether the populated fields agree with `status`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self.status {
            ConnectionStatus::Connected => {
                self.session_id.is_some() && self.connected_at.is_some() && self.error.is_none()
            }
            ConnectionStatus::Error => self.error.is_some() && self.session_id.is_none(),
            _ => self.error.is_none() && self.session_id.is_none(),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}
