//! Control Module
//!
//! Typed device operations built on the transport client.
//!
//! ## Responsibilities
//! - Map device features to their get/set opcodes
//! - Implement the GET-then-SET toggle and its post-condition check
//! - Render device values as operator-facing text
//!
//! Every function takes the session's `Client` explicitly; there is no
//! process-wide state.

use std::fmt;

use crate::error::{BridgeError, Result};
use crate::network::Client;
use crate::protocol::Opcode;

/// Value the device answers to the test opcode
pub const PING_VALUE: u32 = 0x6969_6969;

/// A switchable device feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Board boot source: 0 = NAND, 1 = SD card
    BootMode,

    /// XVC (Xilinx Virtual Cable) server
    Xvc,

    /// Serial-over-TCP server
    Serial,

    /// Verbose serial logging on the bridge
    Logger,
}

impl Feature {
    pub const ALL: [Feature; 4] = [Feature::BootMode, Feature::Xvc, Feature::Serial, Feature::Logger];

    /// Opcode reading the current value
    pub fn get_opcode(self) -> Opcode {
        match self {
            Feature::BootMode => Opcode::GetBootMode,
            Feature::Xvc => Opcode::GetXvcRunState,
            Feature::Serial => Opcode::GetSerialRunState,
            Feature::Logger => Opcode::GetLoggerState,
        }
    }

    /// Opcode writing a new value
    pub fn set_opcode(self) -> Opcode {
        match self {
            Feature::BootMode => Opcode::SetBootMode,
            Feature::Xvc => Opcode::SetXvcRunState,
            Feature::Serial => Opcode::SetSerialRunState,
            Feature::Logger => Opcode::SetLoggerState,
        }
    }

    /// Describe a value read with `get_opcode`
    pub fn describe(self, value: u32) -> String {
        let text = match (self, value) {
            (Feature::BootMode, 0) => "Board boot mode: NAND.",
            (Feature::BootMode, 1) => "Board boot mode: SD card.",
            (Feature::Xvc, 0) => "XVC server is not running.",
            (Feature::Xvc, 1) => "XVC server is running.",
            (Feature::Serial, 0) => "Serial server is not running.",
            (Feature::Serial, 1) => "Serial server is running.",
            (Feature::Logger, 0) => "Serial logging is disabled.",
            (Feature::Logger, 1) => "Serial logging is enabled.",
            _ => return format!("Failure: Unknown value {:#x}.", value),
        };
        text.to_string()
    }

    /// Describe the outcome of a successful toggle
    pub fn describe_change(self, after: u32) -> String {
        let on = after == 1;
        match self {
            Feature::BootMode => format!("Boot from {}", if on { "SD card." } else { "NAND." }),
            Feature::Xvc => format!("XVC server has {}", if on { "started." } else { "stopped." }),
            Feature::Serial => format!("Serial server has {}", if on { "started." } else { "stopped." }),
            Feature::Logger => format!("Serial logging has been {}", if on { "enabled." } else { "disabled." }),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Feature::BootMode => "boot mode",
            Feature::Xvc => "xvc server",
            Feature::Serial => "serial server",
            Feature::Logger => "logger",
        })
    }
}

/// Result of a toggle: raw values before and after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    pub before: u32,
    pub after: u32,
}

impl Toggle {
    /// Whether the feature ended up enabled
    pub fn is_on(&self) -> bool {
        self.after == 1
    }
}

// =============================================================================
// Feature Operations
// =============================================================================

/// Read the raw value of a feature
pub fn query(client: &mut Client, feature: Feature) -> Result<u32> {
    Ok(client.request(feature.get_opcode(), 0)?.value)
}

/// Read a feature as a flag; values other than 0/1 are an error
pub fn query_flag(client: &mut Client, feature: Feature) -> Result<bool> {
    match query(client, feature)? {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(BridgeError::UnexpectedValue {
            opcode: feature.get_opcode(),
            value,
        }),
    }
}

/// Set a feature and return the value the device reports afterwards
pub fn set(client: &mut Client, feature: Feature, on: bool) -> Result<u32> {
    Ok(client.request(feature.set_opcode(), u8::from(on))?.value)
}

/// Flip a feature: GET, then SET the negation, then compare
///
/// Two round-trips, not atomic. If the reported value did not change the
/// call fails with `StateError`; whether the device refused or another
/// client raced us is not distinguished.
pub fn toggle(client: &mut Client, feature: Feature) -> Result<Toggle> {
    let before = query(client, feature)?;
    let after = client.request(feature.set_opcode(), u8::from(before == 0))?.value;

    if after == before {
        tracing::warn!("Toggling {} had no effect (value {})", feature, before);
        return Err(BridgeError::StateError { before, after });
    }

    tracing::debug!("Toggled {}: {} -> {}", feature, before, after);
    Ok(Toggle { before, after })
}

// =============================================================================
// Actions
// =============================================================================

/// Pulse the target board's reset line
pub fn reset_board(client: &mut Client) -> Result<u32> {
    Ok(client.request(Opcode::ResetBoard, 0)?.value)
}

/// Exchange the test opcode; the device answers `PING_VALUE`
pub fn ping(client: &mut Client) -> Result<u32> {
    let value = client.request(Opcode::Test, 0)?.value;
    if value != PING_VALUE {
        tracing::warn!("Unexpected test reply {:#x}", value);
    }
    Ok(value)
}

/// Wipe Wi-Fi settings; the bridge restarts into its access point
pub fn reconfig_wifi(client: &mut Client) -> Result<()> {
    client.send_command(Opcode::ReconfigWifi, 0)?;
    Ok(())
}

/// Restart the command server; the connection is lost
pub fn reset_server(client: &mut Client) -> Result<()> {
    client.send_command(Opcode::ResetServer, 0)?;
    Ok(())
}
