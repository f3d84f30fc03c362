//! Transport Client
//!
//! Owns one TCP connection to the bridge and performs synchronous
//! request/response exchanges over it.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::protocol::{decode_response, encode_command, Opcode, Response, RESPONSE_SIZE};
use super::address;

/// Byte written by the liveness probe; the device ignores it between frames
pub const PROBE_BYTE: u8 = 0x00;

/// Client for the bridge command server
///
/// Two states: Disconnected (no socket) and Connected (socket held). Only
/// one request is ever in flight because every call blocks until its
/// response has been read or the read deadline expires.
pub struct Client {
    /// Client configuration
    config: Config,

    /// Last validated target, kept across failed connects for `reconnect`
    target: Option<SocketAddrV4>,

    /// Exclusively owned socket; `Some` only after a successful connect
    stream: Option<TcpStream>,
}

impl Client {
    /// Create a disconnected client
    pub fn new(config: Config) -> Self {
        Self {
            config,
            target: None,
            stream: None,
        }
    }

    /// Connect to `ip:port`
    ///
    /// Inputs are validated before any I/O. Any socket already held is
    /// closed first, even when the new attempt then fails, in which case the
    /// client ends up disconnected.
    pub fn connect(&mut self, ip: &str, port: u32) -> Result<()> {
        let target = address::resolve(ip, port)?;
        self.disconnect();
        self.target = Some(target);
        self.open(target)
    }

    /// Connect again to the last address passed to `connect`
    pub fn reconnect(&mut self) -> Result<()> {
        let target = self
            .target
            .ok_or_else(|| BridgeError::InvalidAddress("no known address to reconnect to".to_string()))?;
        self.disconnect();
        self.open(target)
    }

    /// Close the socket, if any
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone; closing happens on drop regardless
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!("Closed connection to {}", self.describe_target());
        }
    }

    /// Best-effort liveness check
    ///
    /// Writes a single probe byte. A failed write means the connection is
    /// dead; a successful one does not prove the peer is alive (half-open
    /// connections pass and only fail on the next real exchange).
    pub fn is_connected(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        match stream.write(&[PROBE_BYTE]) {
            Ok(1) => true,
            Ok(_) => false,
            Err(e) => {
                tracing::debug!("Liveness probe failed: {}", e);
                false
            }
        }
    }

    /// Send one command and wait for its response
    ///
    /// Returns `Ok(None)` for the fire-and-forget opcodes, which are never
    /// followed by a read. Failures leave the connection state unchanged.
    pub fn send_command(&mut self, opcode: Opcode, argument: u8) -> Result<Option<Response>> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }

        let read_timeout = self.config.read_timeout();
        let stream = self.stream.as_mut().ok_or(BridgeError::NotConnected)?;

        let frame = encode_command(opcode, argument);
        tracing::trace!("Sending {} ({:02x?})", opcode, &frame[..]);
        stream.write_all(&frame)?;

        if !opcode.expects_response() {
            tracing::debug!("Sent fire-and-forget command: {}", opcode);
            return Ok(None);
        }

        let mut buf = [0u8; RESPONSE_SIZE];
        read_exact_within(stream, &mut buf, read_timeout)?;
        tracing::trace!("Received {:02x?}", buf);

        let response = decode_response(&buf).inspect_err(|e| {
            tracing::warn!("Stream out of sync with {}: {}", self.describe_target(), e);
        })?;

        if response.opcode != opcode as u8 {
            tracing::warn!(
                "Response echoes opcode {} for request {}",
                response.opcode,
                opcode
            );
        }

        Ok(Some(response))
    }

    /// Send a command that must produce a response
    pub fn request(&mut self, opcode: Opcode, argument: u8) -> Result<Response> {
        self.send_command(opcode, argument)?
            .ok_or(BridgeError::MissingResponse(opcode))
    }

    /// IP of the current (or last attempted) target
    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.target.map(|t| *t.ip())
    }

    /// Port of the current (or last attempted) target
    pub fn port(&self) -> Option<u16> {
        self.target.map(|t| t.port())
    }

    /// Current (or last attempted) target
    pub fn target(&self) -> Option<SocketAddrV4> {
        self.target
    }

    /// Client configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a fresh socket to `target`
    fn open(&mut self, target: SocketAddrV4) -> Result<()> {
        let addr = SocketAddr::V4(target);
        let stream = match self.config.connect_timeout() {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .inspect_err(|e| tracing::debug!("Connect to {} failed: {}", addr, e))?;

        stream.set_nodelay(self.config.nodelay)?;
        stream.set_write_timeout(self.config.write_timeout())?;

        tracing::debug!("Connected to {}", addr);
        self.stream = Some(stream);
        Ok(())
    }

    fn describe_target(&self) -> String {
        self.target
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Fill `buf` completely or fail once `timeout` has elapsed
///
/// The remaining time is re-applied before every read, so a peer trickling
/// bytes cannot stretch the bound. With no timeout the read blocks until the
/// frame is complete or the peer goes away. A short buffer is never returned.
fn read_exact_within(stream: &mut TcpStream, buf: &mut [u8], timeout: Option<Duration>) -> Result<()> {
    let deadline = timeout.map(|t| (t, Instant::now() + t));
    let mut filled = 0;

    while filled < buf.len() {
        let remaining = match deadline {
            Some((timeout, at)) => {
                let remaining = at.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::debug!("Read deadline hit after {} of {} bytes", filled, buf.len());
                    return Err(BridgeError::Timeout(timeout));
                }
                Some(remaining)
            }
            None => None,
        };
        stream.set_read_timeout(remaining)?;

        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(BridgeError::Connection(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("peer closed after {} of {} bytes", filled, buf.len()),
                )));
            }
            Ok(n) => filled += n,
            // Socket timeouts may wake slightly early; the deadline decides
            Err(e) if matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            ) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
