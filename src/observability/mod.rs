//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Listener and handlers produce:
//!     → logging.rs (ServerLog events, rendered by tracing)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
