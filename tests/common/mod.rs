//! Shared utilities for integration tests.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use accept_loop::config::ListenerConfig;
use accept_loop::net::connection::ConnectionId;
use accept_loop::{Listener, ServerLog};
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;

/// A single recorded log event.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Event {
    Starting,
    Listening(SocketAddr),
    Accepted(ConnectionId, SocketAddr),
    Handling(ConnectionId, SocketAddr),
    AcceptFailed(String),
    CloseFailed(ConnectionId, SocketAddr, String),
}

/// ServerLog that keeps every event in memory.
#[derive(Default)]
pub struct RecordingLog {
    events: Mutex<Vec<Event>>,
}

#[allow(dead_code)]
impl RecordingLog {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn accepted(&self) -> Vec<(ConnectionId, SocketAddr)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Accepted(id, peer) => Some((id, peer)),
                _ => None,
            })
            .collect()
    }

    pub fn handled(&self) -> Vec<(ConnectionId, SocketAddr)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Handling(id, peer) => Some((id, peer)),
                _ => None,
            })
            .collect()
    }

    /// Poll until `n` handling events are recorded.
    pub async fn wait_for_handled(&self, n: usize) {
        for _ in 0..200 {
            if self.handled().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} handled connections, saw {}", self.handled().len());
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl ServerLog for RecordingLog {
    fn starting(&self) {
        self.push(Event::Starting);
    }

    fn listening(&self, address: SocketAddr) {
        self.push(Event::Listening(address));
    }

    fn connection_accepted(&self, id: ConnectionId, peer: SocketAddr) {
        self.push(Event::Accepted(id, peer));
    }

    fn handling(&self, id: ConnectionId, peer: SocketAddr) {
        self.push(Event::Handling(id, peer));
    }

    fn accept_failed(&self, error: &io::Error) {
        self.push(Event::AcceptFailed(error.to_string()));
    }

    fn close_failed(&self, id: ConnectionId, peer: SocketAddr, error: &io::Error) {
        self.push(Event::CloseFailed(id, peer, error.to_string()));
    }
}

/// Bind a listener on an ephemeral loopback port and run it in the background.
pub async fn spawn_listener(log: Arc<RecordingLog>) -> (SocketAddr, JoinHandle<()>) {
    let config = ListenerConfig {
        host: "127.0.0.1".into(),
        port: 0,
    };
    let listener = Listener::bind(&config, log).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = listener.run().await;
    });
    (addr, handle)
}

/// Stream whose shutdown fails, as on a socket that is already gone.
#[allow(dead_code)]
pub struct BrokenStream;

impl AsyncWrite for BrokenStream {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::NotConnected)))
    }
}
