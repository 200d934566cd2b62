//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! The lifecycle manager never talks to a wallet directly. It drives a
//! [`WalletAdapter`] supplied by the caller, which owns the actual I/O
//! (extension messaging, popup windows, websockets).
//!
//! ```text
//!     ┌──────────────────────┐        ┌────────────────┐
//!     │  ConnectionManager   │───────▶│ WalletAdapter  │──▶ wallet
//!     │  (application)       │        │ (outbound port)│
//!     └──────────────────────┘        └────────────────┘
//! ```

pub mod outbound;

pub use outbound::wallet::{SharedAdapter, WalletAdapter};
