//! Infrastructure layer.
//!
//! Technical concerns that support the lifecycle manager without containing
//! connection logic.
//!
//! # Submodules
//!
//! - [`config`] - Configuration loading, validation and logging setup
pub mod config;
