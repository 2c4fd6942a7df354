//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem
//! - Define [`ServerLog`], the collaborator through which the listener and
//!   handlers report what they do
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Full format for development, compact for dense terminals
//! - Log level configurable via config and `RUST_LOG`

use std::io;
use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};
use crate::net::connection::ConnectionId;

/// Sink for every event the accept loop produces.
///
/// Implementations must tolerate concurrent, unordered calls from many
/// handler tasks.
pub trait ServerLog: Send + Sync {
    /// The server is about to bind.
    fn starting(&self);

    /// The listening socket is bound.
    fn listening(&self, address: SocketAddr);

    /// A connection was accepted and is being dispatched.
    fn connection_accepted(&self, id: ConnectionId, peer: SocketAddr);

    /// A handler picked up its connection.
    fn handling(&self, id: ConnectionId, peer: SocketAddr);

    /// A single accept call failed; the loop continues.
    fn accept_failed(&self, error: &io::Error);

    /// Closing a connection failed; the handler continues.
    fn close_failed(&self, id: ConnectionId, peer: SocketAddr, error: &io::Error);
}

/// [`ServerLog`] that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl ServerLog for TracingLog {
    fn starting(&self) {
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting server");
    }

    fn listening(&self, address: SocketAddr) {
        tracing::info!(address = %address, "Server is listening");
    }

    fn connection_accepted(&self, id: ConnectionId, peer: SocketAddr) {
        tracing::info!(connection_id = %id, peer_addr = %peer, "New connection received");
    }

    fn handling(&self, id: ConnectionId, peer: SocketAddr) {
        tracing::info!(connection_id = %id, peer_addr = %peer, "Handling connection");
    }

    fn accept_failed(&self, error: &io::Error) {
        tracing::error!(error = %error, "Failed to accept connection");
    }

    fn close_failed(&self, id: ConnectionId, peer: SocketAddr, error: &io::Error) {
        tracing::error!(
            connection_id = %id,
            peer_addr = %peer,
            error = %error,
            "Error closing connection"
        );
    }
}

/// Build the level filter: `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Install the global tracing subscriber writing to stdout.
pub fn init_logging(config: &ObservabilityConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    match config.log_format {
        LogFormat::Full => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
    }
}
