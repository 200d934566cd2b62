//! Default automatic-recovery configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::RecoveryOptions;

/// Recovery policy applied to wallets that never had options set.
#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryConfig {
    /// Schedule reconnect attempts after a failed connect.
    #[serde(default)]
    pub auto_reconnect: bool,
    /// Delay between automatic attempts (milliseconds).
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    /// Attempts allowed before giving up; 0 disables recovery.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

const fn default_reconnect_interval_ms() -> u64 {
    3000
}

const fn default_max_reconnect_attempts() -> u32 {
    3
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: false,
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl RecoveryConfig {
    #[must_use]
    pub fn to_options(&self) -> RecoveryOptions {
        RecoveryOptions {
            auto_reconnect: self.auto_reconnect,
            reconnect_interval: Duration::from_millis(self.reconnect_interval_ms),
            max_reconnect_attempts: self.max_reconnect_attempts,
        }
    }
}

impl From<&RecoveryConfig> for RecoveryOptions {
    fn from(config: &RecoveryConfig) -> Self {
        config.to_options()
    }
}
