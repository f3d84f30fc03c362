//! Connection Handler
//!
//! Serves one client connection of the simulated command server.

use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{Receiver, TryRecvError};
use parking_lot::Mutex;

use crate::error::{BridgeError, Result};
use crate::protocol::{write_response, Response};
use super::{CommandParser, Device, Reply};

/// Read buffer size, as on the device
const READ_BUFFER_SIZE: usize = 64;

/// Handles a single client connection
pub struct SimConnection {
    stream: TcpStream,

    /// Shared device state
    device: Arc<Mutex<Device>>,

    /// Disconnects once the server shuts down
    shutdown: Receiver<()>,

    /// Parse requests but never answer
    silent: bool,

    /// Peer address for logging
    peer_addr: String,
}

impl SimConnection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        device: Arc<Mutex<Device>>,
        shutdown: Receiver<()>,
        silent: bool,
        poll_interval: Duration,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Accepted sockets inherit non-blocking mode from the listener
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(poll_interval))?;

        Ok(Self {
            stream,
            device,
            shutdown,
            silent,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Feeds received bytes through the parser and answers each completed
    /// command. Returns when the client disconnects, a fire-and-forget
    /// command restarts the server, or the server shuts down.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let mut parser = CommandParser::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let n = match self.stream.read(&mut buf) {
                Ok(0) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Ok(n) => n,
                Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if self.shutdown.try_recv() == Err(TryRecvError::Disconnected) {
                        tracing::debug!("Server shutting down, closing {}", self.peer_addr);
                        return Ok(());
                    }
                    continue;
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("Connection reset by client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e.into());
                }
            };

            for &byte in &buf[..n] {
                let Some(command) = parser.feed(byte) else {
                    continue;
                };
                tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

                let reply = self.device.lock().execute(command);
                match reply {
                    Reply::Status(value) if !self.silent => {
                        self.send_response(Response::status(command.opcode, value))?;
                    }
                    Reply::Status(_) => {}
                    Reply::Disconnect => {
                        tracing::debug!("{} restarts the server, dropping {}", command.opcode, self.peer_addr);
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        match write_response(&mut self.stream, &response) {
            Err(BridgeError::Connection(ref e))
                if matches!(
                    e.kind(),
                    ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                ) =>
            {
                tracing::debug!("Client {} disconnected before response could be sent", self.peer_addr);
                Ok(())
            }
            other => other,
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
