//! Simulator TCP Server
//!
//! Accepts connections and serves each one on its own thread against a
//! shared device.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::Result;
use super::{Device, SimConnection};

/// How often idle loops check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Simulated bridge command server
pub struct SimServer {
    listener: TcpListener,
    device: Arc<Mutex<Device>>,
    silent: bool,
}

impl SimServer {
    /// Bind the listening socket
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            device: Arc::new(Mutex::new(Device::new())),
            silent: false,
        })
    }

    /// Start from a specific device state
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = Arc::new(Mutex::new(device));
        self
    }

    /// Accept and parse requests but never reply
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared device state
    pub fn device(&self) -> Arc<Mutex<Device>> {
        Arc::clone(&self.device)
    }

    /// Serve on a background thread
    pub fn spawn(self) -> Result<SimHandle> {
        let addr = self.local_addr()?;
        let device = self.device();
        let active = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);

        let thread = {
            let active = Arc::clone(&active);
            thread::Builder::new()
                .name("bridge-sim-accept".to_string())
                .spawn(move || {
                    if let Err(e) = self.accept_loop(&shutdown_rx, &active) {
                        tracing::error!("Simulator accept loop failed: {}", e);
                    }
                })?
        };

        tracing::info!("Simulated bridge listening on {}", addr);
        Ok(SimHandle {
            addr,
            device,
            active,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Serve on the current thread until the process exits
    pub fn run(self) -> Result<()> {
        // Holding the sender keeps the shutdown channel open forever
        let (_shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);
        let active = Arc::new(AtomicUsize::new(0));
        tracing::info!("Simulated bridge listening on {}", self.local_addr()?);
        self.accept_loop(&shutdown_rx, &active)
    }

    fn accept_loop(self, shutdown: &Receiver<()>, active: &Arc<AtomicUsize>) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    let mut conn = match SimConnection::new(
                        stream,
                        Arc::clone(&self.device),
                        shutdown.clone(),
                        self.silent,
                        POLL_INTERVAL,
                    ) {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!("Failed to set up connection from {}: {}", peer, e);
                            continue;
                        }
                    };

                    active.fetch_add(1, Ordering::SeqCst);
                    let active = Arc::clone(active);
                    workers.retain(|w| !w.is_finished());
                    workers.push(thread::spawn(move || {
                        if let Err(e) = conn.handle() {
                            tracing::warn!("Connection {} ended with error: {}", conn.peer_addr(), e);
                        }
                        drop(conn);
                        active.fetch_sub(1, Ordering::SeqCst);
                    }));
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    match shutdown.recv_timeout(POLL_INTERVAL) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        for worker in workers {
            let _ = worker.join();
        }
        tracing::info!("Simulated bridge stopped");
        Ok(())
    }
}

/// Handle to a running simulator; shuts it down on drop
pub struct SimHandle {
    addr: SocketAddr,
    device: Arc<Mutex<Device>>,
    active: Arc<AtomicUsize>,
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SimHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Shared device state
    pub fn device(&self) -> Arc<Mutex<Device>> {
        Arc::clone(&self.device)
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop accepting, close every connection and wait for the threads
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Dropping the only sender disconnects every receiver
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
