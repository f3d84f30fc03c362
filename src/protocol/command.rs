//! Command definitions
//!
//! Opcode table of the bridge command server.

use std::fmt;

use crate::error::BridgeError;

/// Command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    SetBootMode = 0,
    GetBootMode = 1,
    ResetBoard = 2,
    SetXvcRunState = 3,
    GetXvcRunState = 4,
    SetSerialRunState = 5,
    GetSerialRunState = 6,
    ReconfigWifi = 7,
    SetLoggerState = 8,
    GetLoggerState = 9,
    ResetServer = 10,
    /// Reserved test opcode; the device answers with `0x69696969`
    Test = 100,
}

impl Opcode {
    /// Every opcode the device understands, in wire order
    pub const ALL: [Opcode; 12] = [
        Opcode::SetBootMode,
        Opcode::GetBootMode,
        Opcode::ResetBoard,
        Opcode::SetXvcRunState,
        Opcode::GetXvcRunState,
        Opcode::SetSerialRunState,
        Opcode::GetSerialRunState,
        Opcode::ReconfigWifi,
        Opcode::SetLoggerState,
        Opcode::GetLoggerState,
        Opcode::ResetServer,
        Opcode::Test,
    ];

    /// Set-type opcodes carry one argument byte after the opcode
    pub fn has_argument(self) -> bool {
        matches!(
            self,
            Opcode::SetBootMode
                | Opcode::SetXvcRunState
                | Opcode::SetSerialRunState
                | Opcode::SetLoggerState
        )
    }

    /// False for the fire-and-forget opcodes (the device resets instead of replying)
    pub fn expects_response(self) -> bool {
        !matches!(self, Opcode::ReconfigWifi | Opcode::ResetServer)
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Opcode::SetBootMode => "set boot mode",
            Opcode::GetBootMode => "get boot mode",
            Opcode::ResetBoard => "reset board",
            Opcode::SetXvcRunState => "set xvc running state",
            Opcode::GetXvcRunState => "get xvc running state",
            Opcode::SetSerialRunState => "set serial running state",
            Opcode::GetSerialRunState => "get serial running state",
            Opcode::ReconfigWifi => "reconfig wifi",
            Opcode::SetLoggerState => "set logger state",
            Opcode::GetLoggerState => "get logger state",
            Opcode::ResetServer => "reset server",
            Opcode::Test => "test",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = BridgeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|op| *op as u8 == code)
            .ok_or(BridgeError::UnknownOpcode(code))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single request unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub opcode: Opcode,

    /// Only transmitted for set-type opcodes
    pub argument: u8,
}

impl Command {
    /// Command without an argument
    pub fn new(opcode: Opcode) -> Self {
        Self { opcode, argument: 0 }
    }

    /// Command with an argument byte
    pub fn with_argument(opcode: Opcode, argument: u8) -> Self {
        Self { opcode, argument }
    }
}
