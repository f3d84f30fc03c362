//! Network Module
//!
//! TCP transport to the bridge command server.
//!
//! ## Architecture
//! - One blocking socket per client, owned exclusively
//! - One outstanding request at a time
//! - Lazy liveness probe before every exchange

pub mod address;
mod client;

pub use client::{Client, PROBE_BYTE};
