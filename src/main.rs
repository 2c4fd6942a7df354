//! accept-loop
//!
//! Accepts TCP connections, logs each peer, and closes the socket from a
//! detached task.
//!
//! ```text
//!   Client ──connect──▶ Listener ──spawn──▶ ConnectionHandler ──▶ close
//!                         │                        │
//!                         └──────── ServerLog ◀────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use accept_loop::config::validation::validate_config;
use accept_loop::config::{load_config, ConfigError, ServerConfig};
use accept_loop::observability::logging::{init_logging, TracingLog};
use accept_loop::observability::metrics::init_metrics;
use accept_loop::Listener;

#[derive(Parser, Debug)]
#[command(name = "accept-loop")]
#[command(about = "Accept TCP connections, log the peer, close the socket", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind; overrides the config file.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind; overrides the config file.
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Log level or filter directive; overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = self.host {
            config.listener.host = host;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("accept-loop: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability);

    tracing::debug!(
        host = %config.listener.host,
        port = config.listener.port,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match Listener::start(&config.listener, Arc::new(TracingLog)).await {
        Ok(never) => match never {},
        Err(e) => {
            tracing::error!(
                address = %e.address,
                error = %e.source,
                "Unable to bind"
            );
            ExitCode::FAILURE
        }
    }
}
