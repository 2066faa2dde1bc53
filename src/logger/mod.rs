//! Logger module
//!
//! Thin helpers over `tracing`:
//! - Subscriber setup from the `[logging]` section
//! - Server lifecycle logging
//! - Access logging with multiple formats (emitted on the `access` target)
//! - Error and warning logging

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Target used for access log lines, filterable with `RUST_LOG=access=off`
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber with configuration
///
/// Should be called once at application startup. `RUST_LOG` takes precedence
/// over `logging.level`.
pub fn init(config: &Config) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.logging.log_file.as_deref() {
        Some(path) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(writer::file_writer(path)?)
            .try_init(),
        None => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    result.map_err(|e| std::io::Error::new(std::io::ErrorKind::AlreadyExists, e))
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        address = %addr,
        workers = ?config.server.workers,
        max_connections = ?config.performance.max_connections,
        max_body_size = config.http.max_body_size,
        "edge starter listening on http://{addr}"
    );
    tracing::info!(
        host_override = %config.edge.host_override,
        backend = %config.edge.backend_name,
        other_backend = %config.edge.other_backend_name,
        "router configured"
    );
    if let Some(ref path) = config.logging.log_file {
        tracing::info!(path = %path, "logging to file");
    }
}

pub fn log_backend(name: &str, authority: &str) {
    tracing::info!(backend = name, origin = authority, "backend registered");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!(peer = %peer_addr, "connection accepted");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("failed to serve connection: {err:?}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}

pub fn log_shutdown_requested(signal: &str) {
    tracing::info!(signal, "shutdown requested, no longer accepting connections");
}

pub fn log_shutdown_complete(remaining: usize) {
    if remaining == 0 {
        tracing::info!("all connections drained, shutdown complete");
    } else {
        tracing::warn!(remaining, "shutdown deadline reached with connections still open");
    }
}
