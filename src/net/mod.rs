//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → connection.rs (one detached handler per connection)
//!     → close
//!
//! Connection States:
//!     Accepted → Handled → Closed
//! ```
//!
//! # Design Decisions
//! - No connection limit and no backpressure
//! - Handlers are fire-and-forget; nothing joins them
//! - Every path ends in Closed

pub mod connection;
pub mod listener;
