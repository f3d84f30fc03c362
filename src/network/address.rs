//! Address validation
//!
//! Shared by the client and the CLI; runs before any socket is touched.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::{BridgeError, Result};

/// Parse an IPv4 dotted-quad literal
pub fn parse_ip(ip: &str) -> Result<Ipv4Addr> {
    ip.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| BridgeError::InvalidAddress(format!("'{}' is not an IPv4 address", ip)))
}

/// Check a port number is in 0..=65535
pub fn validate_port(port: u32) -> Result<u16> {
    u16::try_from(port)
        .map_err(|_| BridgeError::InvalidAddress(format!("port {} is out of range 0-65535", port)))
}

/// Parse a port from text
pub fn parse_port(port: &str) -> Result<u16> {
    let value = port
        .trim()
        .parse::<u32>()
        .map_err(|_| BridgeError::InvalidAddress(format!("'{}' is not a port number", port)))?;
    validate_port(value)
}

/// Validate both halves of a target address
pub fn resolve(ip: &str, port: u32) -> Result<SocketAddrV4> {
    Ok(SocketAddrV4::new(parse_ip(ip)?, validate_port(port)?))
}
