//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates logging and recovery
//! settings. Configuration is loaded from a TOML file; every section and
//! field is optional.
//!
//! # Example
//!
//! ```no_run
//! use walletlink::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("walletlink.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::logging::LoggingConfig;
use super::recovery::RecoveryConfig;
use crate::error::{ConfigError, Result};

/// Main configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Recovery policy for wallets without explicit options.
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

impl Config {
    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Initialize the global tracing subscriber from the logging section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    fn validate(&self) -> Result<()> {
        if self.recovery.reconnect_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect_interval_ms",
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        if !self.logging.is_known_format() {
            return Err(ConfigError::InvalidValue {
                field: "format",
                reason: format!("expected \"json\" or \"pretty\", got \"{}\"", self.logging.format),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.recovery.auto_reconnect);
        assert_eq!(config.recovery.reconnect_interval_ms, 3000);
        assert_eq!(config.recovery.max_reconnect_attempts, 3);
    }

    #[test]
    fn recovery_section_maps_to_options() {
        let config = Config::parse_toml(
            r#"
[recovery]
auto_reconnect = true
reconnect_interval_ms = 250
max_reconnect_attempts = 5
"#,
        )
        .unwrap();

        let options = config.recovery.to_options();
        assert!(options.is_enabled());
        assert_eq!(options.reconnect_interval, Duration::from_millis(250));
        assert_eq!(options.max_reconnect_attempts, 5);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = Config::parse_toml("[recovery]\nreconnect_interval_ms = 0\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue {
                field: "reconnect_interval_ms",
                ..
            }))
        ));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let result = Config::parse_toml("[logging]\nformat = \"xml\"\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue { field: "format", .. }))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let result = Config::parse_toml("[recovery\n");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }
}
