//! Connection state machine and the per-connection handler.
//!
//! # Responsibilities
//! - Track connection state (Accepted → Handled → Closed)
//! - Generate unique connection IDs for tracing
//! - Close every connection exactly once, on every path

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::observability::logging::ServerLog;
use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state for lifecycle tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted by the listener, not yet picked up by a handler.
    Accepted,
    /// Owned by a running handler.
    Handled,
    /// Socket released. Terminal.
    Closed,
}

/// Closing a connection failed. The socket is released regardless.
#[derive(Debug, Error)]
#[error("error closing connection from {peer}: {source}")]
pub struct CloseError {
    pub peer: SocketAddr,
    #[source]
    pub source: io::Error,
}

/// An accepted socket and its peer.
///
/// [`Connection::close`] consumes the connection, so it can only be closed
/// once. Dropping it without closing still releases the socket.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    id: ConnectionId,
    peer: SocketAddr,
    state: ConnectionState,
    stream: S,
}

impl<S> Connection<S>
where
    S: AsyncWrite + Unpin,
{
    /// Wrap a freshly accepted stream.
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer,
            state: ConnectionState::Accepted,
            stream,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn mark_handled(&mut self) {
        self.state = ConnectionState::Handled;
    }

    /// Shut down the write half and release the socket.
    ///
    /// The stream is dropped even when shutdown fails.
    pub async fn close(mut self) -> Result<(), CloseError> {
        let result = self.stream.shutdown().await;
        let Self { peer, stream, .. } = self;
        drop(stream);

        result.map_err(|source| CloseError { peer, source })
    }
}

/// Processes exactly one connection to completion.
#[derive(Clone)]
pub struct ConnectionHandler {
    log: Arc<dyn ServerLog>,
}

impl ConnectionHandler {
    pub fn new(log: Arc<dyn ServerLog>) -> Self {
        Self { log }
    }

    /// Log the connection and close it. Nothing is read or written.
    ///
    /// Close failures are logged and swallowed. Always ends in
    /// [`ConnectionState::Closed`].
    pub async fn handle<S>(&self, mut conn: Connection<S>) -> ConnectionState
    where
        S: AsyncWrite + Unpin,
    {
        let id = conn.id();
        let peer = conn.peer();
        self.log.handling(id, peer);
        conn.mark_handled();

        match conn.close().await {
            Ok(()) => {
                metrics::connection_closed();
                tracing::trace!(connection_id = %id, "Connection closed");
            }
            Err(e) => {
                metrics::close_failed();
                self.log.close_failed(id, peer, &e.source);
            }
        }
        ConnectionState::Closed
    }
}
