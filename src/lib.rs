//! Minimal TCP accept loop.
//!
//! Accepts connections, logs the peer, and closes each socket from its own
//! detached task.

pub mod config;
pub mod net;
pub mod observability;

pub use config::schema::ServerConfig;
pub use net::connection::{Connection, ConnectionHandler};
pub use net::listener::{BindError, Listener};
pub use observability::logging::{ServerLog, TracingLog};
