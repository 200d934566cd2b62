//! Automatic recovery policy for a single wallet.

use std::time::Duration;

/// Shortest delay allowed between automatic attempts.
pub const MIN_RECONNECT_INTERVAL: Duration = Duration::from_millis(100);

/// Longest delay allowed between automatic attempts.
pub const MAX_RECONNECT_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Per-wallet automatic recovery policy.
///
/// Recovery is only active when `auto_reconnect` is set *and*
/// `max_reconnect_attempts` is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryOptions {
    pub auto_reconnect: bool,
    pub reconnect_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: false,
            reconnect_interval: Duration::from_millis(3000),
            max_reconnect_attempts: 3,
        }
    }
}

impl RecoveryOptions {
    /// Options with automatic recovery switched on.
    #[must_use]
    pub fn auto(reconnect_interval: Duration, max_reconnect_attempts: u32) -> Self {
        Self {
            auto_reconnect: true,
            reconnect_interval,
            max_reconnect_attempts,
        }
    }

    /// Options with automatic recovery switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            auto_reconnect: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.auto_reconnect && self.max_reconnect_attempts > 0
    }

    /// Whether another automatic attempt is allowed after `attempts` so far.
    #[must_use]
    pub const fn allows_attempt(&self, attempts: u32) -> bool {
        self.is_enabled() && attempts < self.max_reconnect_attempts
    }

    /// Bring `reconnect_interval` into the supported range.
    ///
    /// Returns the adjusted options and whether anything changed.
    #[must_use]
    pub fn clamped(mut self) -> (Self, bool) {
        let interval = self
            .reconnect_interval
            .clamp(MIN_RECONNECT_INTERVAL, MAX_RECONNECT_INTERVAL);
        let changed = interval != self.reconnect_interval;
        self.reconnect_interval = interval;
        (self, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disabled() {
        assert!(!RecoveryOptions::default().is_enabled());
    }

    #[test]
    fn zero_attempts_disables_even_with_auto_reconnect() {
        let options = RecoveryOptions::auto(Duration::from_secs(1), 0);
        assert!(!options.is_enabled());
        assert!(!options.allows_attempt(0));
    }

    #[test]
    fn attempts_are_bounded_by_max() {
        let options = RecoveryOptions::auto(Duration::from_secs(1), 2);
        assert!(options.allows_attempt(0));
        assert!(options.allows_attempt(1));
        assert!(!options.allows_attempt(2));
    }

    #[test]
    fn tiny_interval_is_clamped_up() {
        let (options, changed) = RecoveryOptions::auto(Duration::ZERO, 3).clamped();
        assert!(changed);
        assert_eq!(options.reconnect_interval, MIN_RECONNECT_INTERVAL);
    }

    #[test]
    fn huge_interval_is_clamped_down() {
        let (options, changed) =
            RecoveryOptions::auto(Duration::from_secs(24 * 60 * 60), 3).clamped();
        assert!(changed);
        assert_eq!(options.reconnect_interval, MAX_RECONNECT_INTERVAL);
    }

    #[test]
    fn interval_in_range_is_untouched() {
        let original = RecoveryOptions::auto(Duration::from_millis(500), 3);
        let (options, changed) = original.clamped();
        assert!(!changed);
        assert_eq!(options, original);
    }
}
