//! Metrics collection and exposition.
//!
//! # Metrics
//! - `listener_connections_accepted_total` (counter)
//! - `listener_accept_errors_total` (counter)
//! - `listener_connections_closed_total` (counter)
//! - `listener_close_errors_total` (counter)
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const CONNECTIONS_ACCEPTED: &str = "listener_connections_accepted_total";
pub const ACCEPT_ERRORS: &str = "listener_accept_errors_total";
pub const CONNECTIONS_CLOSED: &str = "listener_connections_closed_total";
pub const CLOSE_ERRORS: &str = "listener_close_errors_total";

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn connection_accepted() {
    metrics::counter!(CONNECTIONS_ACCEPTED).increment(1);
}

pub fn accept_failed() {
    metrics::counter!(ACCEPT_ERRORS).increment(1);
}

pub fn connection_closed() {
    metrics::counter!(CONNECTIONS_CLOSED).increment(1);
}

pub fn close_failed() {
    metrics::counter!(CLOSE_ERRORS).increment(1);
}
