//! API gatekeeper (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────┐
//!                      │                  GATEKEEPER                   │
//!   Client Request     │  ┌────────┐   ┌──────────────────────────┐    │
//!   ───────────────────┼─▶│  http  │──▶│ gate (only /api/*)       │    │
//!                      │  │ server │   │  scope → CORS → limiter  │    │
//!                      │  └────────┘   └────────────┬─────────────┘    │
//!                      │                            │ admitted         │
//!                      │                            ▼                  │
//!   Client Response    │  ┌────────────────┐   ┌──────────┐            │
//!   ◀──────────────────┼──│ CORS + security│◀──│ upstream │◀───────────┼──── Content
//!                      │  │    headers     │   │ forwarder│            │     app
//!                      │  └────────────────┘   └──────────┘            │
//!                      │                                               │
//!                      │  background: eviction sweep, config reload,   │
//!                      │              admin API, metrics endpoint      │
//!                      └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_gatekeeper::config::{self, watcher::ConfigWatcher};
use api_gatekeeper::observability::{logging, metrics};
use api_gatekeeper::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "api-gatekeeper")]
#[command(about = "Rate-limiting, CORS-enforcing front for the blog CMS", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Reload the gate policy when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::load_default()?,
    };

    logging::init(&config.observability);
    tracing::info!("api-gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        environment = ?config.gate.environment,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let _signals = shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
