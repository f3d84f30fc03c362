//! # bridgectl
//!
//! Remote-control client for the ESP8266 XVC/serial bridge:
//! - Fixed-format binary protocol with a magic header for desync detection
//! - Blocking TCP transport with exact-length, deadline-bounded reads
//! - Typed control operations (boot mode, XVC, serial, logger, resets)
//! - An in-process device simulator for testing
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 CLI / Interactive Shell                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Control                                 │
//! │           (get / set / toggle, explicit session)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Transport Client                            │
//! │       (connect, liveness probe, 9-byte exact read)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                ┌──────▼──────┐            ┌─────────────┐
//!                │    Codec    │◄───TCP────►│  Bridge /   │
//!                │  (framing)  │            │  Simulator  │
//!                └─────────────┘            └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod control;
pub mod sim;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BridgeError, Result};
pub use config::Config;
pub use network::Client;
pub use protocol::{Opcode, Response};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bridgectl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
