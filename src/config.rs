//! Configuration for bridgectl
//!
//! Centralized client configuration with sensible defaults.

use std::time::Duration;

/// Default TCP port of the bridge command server
pub const DEFAULT_PORT: u16 = 42069;

/// Address the bridge uses while serving its Wi-Fi setup access point
pub const ACCESS_POINT_IP: &str = "192.168.4.1";

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Addressing
    // -------------------------------------------------------------------------
    /// Port used when the caller does not name one
    pub default_port: u16,

    // -------------------------------------------------------------------------
    // Socket Configuration
    // -------------------------------------------------------------------------
    /// Overall deadline for reading one response frame (milliseconds, 0 = no deadline)
    pub read_timeout_ms: u64,

    /// Write timeout (milliseconds, 0 = blocking)
    pub write_timeout_ms: u64,

    /// Connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Disable Nagle's algorithm; frames are only a few bytes long
    pub nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            read_timeout_ms: 10_000,
            write_timeout_ms: 10_000,
            connect_timeout_ms: 10_000,
            nodelay: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Read deadline, `None` when reads block until the frame is complete
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    /// Write timeout, `None` when disabled
    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }

    /// Connect timeout, `None` when the OS default applies
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the fallback port
    pub fn default_port(mut self, port: u16) -> Self {
        self.config.default_port = port;
        self
    }

    /// Set the response read deadline (in milliseconds, 0 disables it)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.config.nodelay = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
