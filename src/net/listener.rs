//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections forever
//! - Hand each connection to a detached handler task
//! - Log and survive accept errors

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ListenerConfig;
use crate::net::connection::{Connection, ConnectionHandler};
use crate::observability::logging::ServerLog;
use crate::observability::metrics;

/// The listening socket could not be created. Fatal, never retried.
#[derive(Debug, Error)]
#[error("unable to bind to {address}: {source}")]
pub struct BindError {
    /// Address as configured, bracketed for IPv6 when the host parses.
    pub address: String,
    /// Configured port.
    pub port: u16,
    #[source]
    pub source: io::Error,
}

/// Source of accepted connections for [`Listener::run`].
pub trait Accept: Send {
    type Stream: AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next connection.
    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Accept for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Owns the bound server socket and the accept loop.
pub struct Listener<A = TcpListener> {
    inner: A,
    handler: ConnectionHandler,
    log: Arc<dyn ServerLog>,
}

impl Listener {
    /// Announce startup, bind, and run the accept loop.
    ///
    /// Only returns on bind failure.
    pub async fn start(
        config: &ListenerConfig,
        log: Arc<dyn ServerLog>,
    ) -> Result<Infallible, BindError> {
        log.starting();
        let listener = Self::bind(config, log).await?;
        Ok(listener.run().await)
    }

    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig, log: Arc<dyn ServerLog>) -> Result<Self, BindError> {
        let parsed = config.socket_addr();
        let address = match &parsed {
            Ok(addr) => addr.to_string(),
            Err(_) => format!("{}:{}", config.host, config.port),
        };
        let bind_error = |source: io::Error| BindError {
            address: address.clone(),
            port: config.port,
            source,
        };

        let addr = parsed.map_err(|e| bind_error(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let inner = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;
        log.listening(local_addr);

        Ok(Self::from_acceptor(inner, log))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.inner.local_addr()
    }
}

impl<A: Accept> Listener<A> {
    /// Wrap an already bound connection source.
    pub fn from_acceptor(inner: A, log: Arc<dyn ServerLog>) -> Self {
        Self {
            inner,
            handler: ConnectionHandler::new(Arc::clone(&log)),
            log,
        }
    }

    /// Accept connections until the process is killed.
    ///
    /// Handler tasks are detached; the loop never waits on them.
    pub async fn run(mut self) -> Infallible {
        loop {
            match self.inner.accept().await {
                Ok((stream, peer)) => {
                    let conn = Connection::new(stream, peer);
                    metrics::connection_accepted();
                    self.log.connection_accepted(conn.id(), peer);

                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        handler.handle(conn).await;
                    });
                }
                Err(e) => {
                    metrics::accept_failed();
                    self.log.accept_failed(&e);
                }
            }
        }
    }
}
