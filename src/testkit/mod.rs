//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`adapter`] - Mock [`WalletAdapter`](crate::port::WalletAdapter):
//!   `ScriptedAdapter` with queued results, delays and call counters.
//! - [`domain`] - Builders for domain primitives: wallet ids, errors, options.
//! - [`config`] - Canonical test configurations.

pub mod adapter;
pub mod config;
pub mod domain;

pub use adapter::ScriptedAdapter;
