use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use walletlink::domain::RecoveryOptions;
use walletlink::error::{ConfigError, Error};
use walletlink::infrastructure::config::Config;
use walletlink::ConnectionManager;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn config_loads_recovery_defaults_from_file() {
    let file = write_temp_config(
        r#"
[logging]
level = "debug"
format = "json"

[recovery]
auto_reconnect = true
reconnect_interval_ms = 1500
max_reconnect_attempts = 5
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");

    let manager = ConnectionManager::with_config(&config);
    assert_eq!(
        manager.recovery_options(&"w1".into()),
        RecoveryOptions::auto(Duration::from_millis(1500), 5)
    );
}

#[test]
fn config_rejects_zero_interval() {
    let file = write_temp_config(
        r#"
[recovery]
reconnect_interval_ms = 0
"#,
    );

    match Config::load(file.path()) {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "reconnect_interval_ms",
            ..
        })) => {}
        Err(err) => panic!("Expected invalid interval error, got {err}"),
        Ok(_) => panic!("Expected zero interval to be rejected"),
    }
}

#[test]
fn config_missing_file_is_read_error() {
    let result = Config::load("/nonexistent/walletlink.toml");
    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn empty_config_uses_defaults() {
    let file = write_temp_config("");
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.recovery.to_options(), RecoveryOptions::default());
    assert_eq!(config.logging.format, "pretty");
}
