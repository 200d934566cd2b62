use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification of an adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The wallet could not be reached or refused the session.
    ConnectionFailed,
    /// The wallet failed to tear the session down.
    DisconnectFailed,
    /// The user dismissed the wallet prompt.
    UserRejected,
    /// The wallet did not answer in time.
    Timeout,
    /// Anything the adapter could not classify.
    Unknown,
}

impl ErrorCode {
    /// Stable string form, matching the serialized representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::DisconnectFailed => "DISCONNECT_FAILED",
            Self::UserRejected => "USER_REJECTED",
            Self::Timeout => "TIMEOUT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether a failure with this code is worth retrying by default.
    ///
    /// A user rejection is a decision, not a transient fault.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::UserRejected)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`WalletAdapter`](crate::port::outbound::wallet::WalletAdapter).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct AdapterError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AdapterError {
    /// Create an error whose recoverability follows the code's default.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            recoverable: code.is_recoverable(),
        }
    }

    /// Shorthand for [`ErrorCode::ConnectionFailed`].
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConnectionFailed, message)
    }

    /// Shorthand for [`ErrorCode::DisconnectFailed`].
    pub fn disconnect_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DisconnectFailed, message)
    }

    /// Shorthand for [`ErrorCode::UserRejected`].
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UserRejected, message)
    }

    /// Override the default recoverability.
    #[must_use]
    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }
}

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("connection manager has been destroyed")]
    Destroyed,

    /// The runtime shut down before the operation finished.
    #[error("operation cancelled before completion")]
    Cancelled,
}

impl Error {
    /// The adapter failure behind this error, if any.
    #[must_use]
    pub fn as_adapter(&self) -> Option<&AdapterError> {
        match self {
            Self::Adapter(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
