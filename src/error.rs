//! Error types for bridgectl
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::Opcode;

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type for bridgectl operations
#[derive(Debug, Error)]
pub enum BridgeError {
    // -------------------------------------------------------------------------
    // Address Errors
    // -------------------------------------------------------------------------
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Timed out after {0:?} waiting for response")]
    Timeout(Duration),

    #[error("Not connected")]
    NotConnected,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Received header mismatch: {header:02x?}")]
    Protocol { header: [u8; 3] },

    #[error("Invalid frame length: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("No response received for {0}")]
    MissingResponse(Opcode),

    // -------------------------------------------------------------------------
    // Device State Errors
    // -------------------------------------------------------------------------
    #[error("State error, before {before} after {after}")]
    StateError { before: u32, after: u32 },

    #[error("Unexpected value {value:#x} for {opcode}")]
    UnexpectedValue { opcode: Opcode, value: u32 },
}

impl BridgeError {
    /// True for the read-deadline failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout(_))
    }
}
