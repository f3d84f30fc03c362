//! Bridge Simulator Binary
//!
//! Runs a simulated bridge command server for local testing.

use clap::Parser;
use bridgectl::protocol::{Command, Opcode};
use bridgectl::sim::{Device, SimServer};
use tracing_subscriber::{fmt, EnvFilter};

/// Simulated XVC-Serial bridge command server
#[derive(Parser, Debug)]
#[command(name = "bridge-sim")]
#[command(about = "Simulated ESP8266 XVC-Serial bridge command server")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:42069")]
    listen: String,

    /// Initial boot mode (0 = NAND, 1 = SD card)
    #[arg(short, long, default_value = "1")]
    boot_mode: u8,

    /// Parse requests but never answer (exercises client timeouts)
    #[arg(long)]
    silent: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridgectl=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("bridge-sim v{}", bridgectl::VERSION);

    let mut device = Device::new();
    device.execute(Command::with_argument(Opcode::SetBootMode, args.boot_mode));

    let server = match SimServer::bind(&args.listen) {
        Ok(s) => s.with_device(device).silent(args.silent),
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
