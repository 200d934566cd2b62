//! Infrastructure configuration modules.

pub mod logging;
pub mod recovery;
pub mod settings;

pub use logging::LoggingConfig;
pub use recovery::RecoveryConfig;
pub use settings::Config;
