//! Simulated bridge device state

use crate::control::PING_VALUE;
use crate::protocol::{Command, Opcode};

/// What the command server does after executing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Send a status frame carrying this value
    Status(u32),

    /// Restart without replying; the connection drops
    Disconnect,
}

/// Volatile state of one bridge
#[derive(Debug, Clone)]
pub struct Device {
    /// Level driven on the boot-mode pin (1 = SD card)
    boot_mode: u8,
    xvc_running: bool,
    serial_running: bool,
    logger_enabled: bool,

    /// Whether stored Wi-Fi credentials exist
    wifi_configured: bool,

    /// Board reset pulses issued
    board_resets: u32,

    /// Command server restarts (reset server / reconfig wifi)
    restarts: u32,
}

impl Device {
    /// Power-on state: boot from SD card, every server stopped
    pub fn new() -> Self {
        Self {
            boot_mode: 1,
            xvc_running: false,
            serial_running: false,
            logger_enabled: false,
            wifi_configured: true,
            board_resets: 0,
            restarts: 0,
        }
    }

    /// Execute a parsed command
    pub fn execute(&mut self, command: Command) -> Reply {
        let arg = command.argument;
        let value = match command.opcode {
            Opcode::SetBootMode => {
                self.boot_mode = arg;
                u32::from(arg)
            }
            Opcode::GetBootMode => u32::from(self.boot_mode),
            Opcode::ResetBoard => {
                self.board_resets += 1;
                1
            }
            Opcode::SetXvcRunState => {
                self.xvc_running = arg != 0;
                u32::from(self.xvc_running)
            }
            Opcode::GetXvcRunState => u32::from(self.xvc_running),
            Opcode::SetSerialRunState => {
                self.serial_running = arg != 0;
                u32::from(self.serial_running)
            }
            Opcode::GetSerialRunState => u32::from(self.serial_running),
            Opcode::SetLoggerState => {
                self.logger_enabled = arg != 0;
                u32::from(self.logger_enabled)
            }
            Opcode::GetLoggerState => u32::from(self.logger_enabled),
            Opcode::ReconfigWifi => {
                self.wifi_configured = false;
                self.restart();
                return Reply::Disconnect;
            }
            Opcode::ResetServer => {
                self.restart();
                return Reply::Disconnect;
            }
            Opcode::Test => PING_VALUE,
        };

        if self.logger_enabled {
            tracing::debug!("Executed {} -> {:#x}", command.opcode, value);
        }
        Reply::Status(value)
    }

    /// Operator pressed the on-board boot selector button
    pub fn press_boot_selector(&mut self) {
        self.boot_mode = u8::from(self.boot_mode == 0);
    }

    pub fn boot_mode(&self) -> u8 {
        self.boot_mode
    }

    pub fn xvc_running(&self) -> bool {
        self.xvc_running
    }

    pub fn serial_running(&self) -> bool {
        self.serial_running
    }

    pub fn logger_enabled(&self) -> bool {
        self.logger_enabled
    }

    pub fn wifi_configured(&self) -> bool {
        self.wifi_configured
    }

    pub fn board_resets(&self) -> u32 {
        self.board_resets
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// A restart clears everything volatile except the counters
    fn restart(&mut self) {
        *self = Self {
            wifi_configured: self.wifi_configured,
            board_resets: self.board_resets,
            restarts: self.restarts + 1,
            ..Self::new()
        };
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}
