//! Enrichment Gateway
//!
//! Serves enrichment lookups backed by a resilient client.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                 ENRICHMENT GATEWAY                   │
//!   GET /enrichment/id │  ┌────────┐   ┌───────────────────────────────────┐  │
//!   ───────────────────┼─▶│  http  │──▶│         ResilientClient           │  │
//!                      │  │ server │   │                                   │  │
//!                      │  └────────┘   │  breaker ─▶ retry ─▶ attempt ─────┼──┼──▶ Enrichment
//!   JSON result        │       ▲       │     │                    │        │  │     Service
//!   ◀──────────────────┼───────┘       │     ▼                    ▼        │  │
//!                      │               │  fallback ◀── terminal failure    │  │
//!                      │               └───────────────────────────────────┘  │
//!                      │  ┌─────────┐ ┌──────────────┐ ┌──────────────────┐   │
//!                      │  │ config  │ │observability │ │    lifecycle     │   │
//!                      │  └─────────┘ └──────────────┘ └──────────────────┘   │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use enrichment_gateway::config::load_from_env;
use enrichment_gateway::observability::{logging, metrics};
use enrichment_gateway::{BreakerRegistry, HttpServer, ResilientClient, Shutdown};

#[derive(Parser)]
#[command(name = "enrichment-gateway")]
#[command(about = "Enrichment gateway with retries, circuit breaking and graceful degradation", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "ENRICHMENT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_from_env(cli.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!("enrichment-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.server.bind_address,
        upstream = %config.upstream.base_url,
        max_attempts = config.retries.max_attempts,
        volume_threshold = config.breaker.volume_threshold,
        error_threshold_percent = config.breaker.error_threshold_percent,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let registry = BreakerRegistry::new(config.breaker.clone());
    let recorder = metrics::spawn_event_recorder(registry.subscribe());
    let client = Arc::new(ResilientClient::from_config(&config, &registry)?);

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown.clone().trigger_on_ctrl_c());

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config.server.clone(), client);
    server.run(listener, shutdown.subscribe()).await?;

    recorder.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}
