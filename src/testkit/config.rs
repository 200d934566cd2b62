//! Canonical test configurations.
//!
//! Single source of truth for recovery policies and configs used across
//! tests. Intervals sit at the supported minimum or a round second so tests
//! on paused time stay short and readable.

use std::time::Duration;

use crate::domain::RecoveryOptions;
use crate::infrastructure::config::{Config, RecoveryConfig};

/// Automatic recovery every `interval_ms`, at most `max_attempts` times.
pub fn recovery(interval_ms: u64, max_attempts: u32) -> RecoveryOptions {
    RecoveryOptions::auto(Duration::from_millis(interval_ms), max_attempts)
}

/// Automatic recovery once a second, three attempts.
pub fn fast_recovery() -> RecoveryOptions {
    recovery(1_000, 3)
}

/// Config whose default recovery policy is [`fast_recovery`].
pub fn config() -> Config {
    Config {
        recovery: RecoveryConfig {
            auto_reconnect: true,
            reconnect_interval_ms: 1_000,
            max_reconnect_attempts: 3,
        },
        ..Config::default()
    }
}
