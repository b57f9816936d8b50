//! ffproxy: forward HTTP/HTTPS proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  FFPROXY                      │
//!                      │                                               │
//!   Client ────────────┼─▶ net::listener ──▶ http::server (accept loop)│
//!                      │                          │ task per conn      │
//!                      │                          ▼                    │
//!                      │                    http::handler              │
//!                      │             parse ─▶ guard ─▶ classify        │
//!                      │                 │                │            │
//!                      │        plain HTTP ▼       CONNECT ▼           │
//!                      │   replay request + copy    200 + tunnel       │
//!                      │          (net::relay)      (net::relay)       │
//!                      │                 │                │            │
//!                      └─────────────────┼────────────────┼────────────┘
//!                                        ▼                ▼
//!                                     Origin server (TCP dial)
//! ```

use std::path::PathBuf;

use clap::Parser;

use ffproxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use ffproxy::lifecycle::{wait_for_shutdown_signal, Shutdown};
use ffproxy::observability::init_logging;
use ffproxy::ProxyServer;

#[derive(Parser)]
#[command(name = "ffproxy")]
#[command(about = "Forward HTTP/HTTPS proxy", version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. ":8080" or "127.0.0.1:3128"
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability)?;

    tracing::info!("ffproxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = ?config.listener.max_connections,
        connect_timeout_secs = ?config.timeouts.connect_secs,
        "Configuration loaded"
    );

    let server = ProxyServer::new(config);
    let listener = server.bind().await?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    shutdown.trigger_on(wait_for_shutdown_signal());

    server.serve(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
