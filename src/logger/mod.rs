//! Logger module
//!
//! Provides logging utilities for both services:
//! - `tracing` subscriber setup
//! - Server lifecycle logging
//! - Access logging with multiple formats

mod format;

pub use format::AccessLogEntry;

use std::net::SocketAddr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Target used for access log lines, filterable on its own
pub const ACCESS_TARGET: &str = "access";

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is used as the filter.
/// Should be called once at application startup.
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| e as Box<dyn std::error::Error>)
}

pub fn log_server_start(service: &str, addr: &SocketAddr, config: &Config) {
    info!("======================================");
    info!("{service} started successfully");
    info!("Listening on: http://{addr}");
    info!("Log level: {}", config.logging.level);
    if let Some(workers) = config.server.workers {
        info!("Worker threads: {workers}");
    }
    if let Some(max) = config.performance.max_connections {
        info!("Max connections: {max}");
    }
    info!("======================================");
}

pub fn log_connection_error(peer_addr: &SocketAddr, err: &impl std::fmt::Display) {
    warn!(peer = %peer_addr, "Failed to serve connection: {err}");
}

pub fn log_connection_rejected(peer_addr: &SocketAddr, active: usize, max: usize) {
    warn!(peer = %peer_addr, "Max connections reached: {active}/{max}. Connection rejected.");
}

pub fn log_connection_timeout(peer_addr: &SocketAddr, secs: u64) {
    warn!(peer = %peer_addr, "Connection timeout after {secs} seconds");
}

pub fn log_accept_error(err: &std::io::Error) {
    error!("Failed to accept connection: {err}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
