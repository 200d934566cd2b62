//! Application services (use cases).
//!
//! Coordinates domain records with the outbound wallet adapters.

pub mod lifecycle;

pub use lifecycle::ConnectionManager;
