//! Response definitions
//!
//! Represents replies from the bridge.

use super::Opcode;

/// Response type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// The only tag the device currently sends
    Status,

    /// Anything else; usually a transmission error
    Unknown(u8),
}

impl ResponseKind {
    pub const STATUS: u8 = 0x00;

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            Self::STATUS => ResponseKind::Status,
            other => ResponseKind::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            ResponseKind::Status => Self::STATUS,
            ResponseKind::Unknown(other) => other,
        }
    }
}

/// A decoded response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Echoed opcode, kept raw so unexpected echoes stay visible
    pub opcode: u8,

    /// Response type tag
    pub kind: ResponseKind,

    /// Little-endian value
    pub value: u32,
}

impl Response {
    /// Create a status response
    pub fn status(opcode: Opcode, value: u32) -> Self {
        Self {
            opcode: opcode as u8,
            kind: ResponseKind::Status,
            value,
        }
    }

    /// The echoed opcode, if it is one the device defines
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.opcode).ok()
    }
}
