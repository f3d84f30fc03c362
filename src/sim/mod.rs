//! Simulator Module
//!
//! An in-process stand-in for the bridge's command server, used by the
//! integration tests and the `bridge-sim` binary.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polled)
//! - One thread per connection, each with its own parser
//! - Device state shared behind a mutex
//! - Shutdown broadcast by dropping the channel sender

mod parser;
mod device;
mod connection;
mod server;

pub use parser::CommandParser;
pub use device::{Device, Reply};
pub use connection::SimConnection;
pub use server::{SimHandle, SimServer};
