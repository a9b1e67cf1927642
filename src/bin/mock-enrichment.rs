//! Mock enrichment service for local runs and chaos testing.
//!
//! `GET /enrich/{userId}` answers with a small activity profile, fails with
//! 503 at the configured rate and waits the configured delay first.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use rand::Rng;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug, Clone)]
#[command(name = "mock-enrichment")]
#[command(about = "Programmable mock of the enrichment upstream", long_about = None)]
struct Cli {
    #[arg(long, env = "MOCK_PORT", default_value_t = 8081)]
    port: u16,

    /// Probability (0.0-1.0) that a request fails with 503.
    #[arg(long, env = "MOCK_SERVICE_FAILURE_RATE", default_value_t = 0.0, value_parser = parse_rate)]
    failure_rate: f64,

    /// Delay before every response, in milliseconds.
    #[arg(long, env = "MOCK_SERVICE_DELAY_MS", default_value_t = 0)]
    delay_ms: u64,
}

fn parse_rate(raw: &str) -> Result<f64, String> {
    let rate: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{rate} is not in 0.0..=1.0"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_enrichment=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Arc::new(Cli::parse());
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));

    let app = Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "UP" })) }))
        .route("/enrich/{user_id}", get(enrich))
        .with_state(cli.clone())
        .layer(TraceLayer::new_for_http());

    tracing::info!(
        address = %addr,
        failure_rate = cli.failure_rate,
        delay_ms = cli.delay_ms,
        "Mock enrichment service listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn enrich(State(cli): State<Arc<Cli>>, Path(user_id): Path<String>) -> Response {
    if cli.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(cli.delay_ms)).await;
    }

    let (fail, loyalty_score) = {
        let mut rng = rand::thread_rng();
        (rng.gen_bool(cli.failure_rate), rng.gen_range(0..100u32))
    };

    if fail {
        tracing::info!(user_id = %user_id, "Simulating failure");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Service Unavailable (Simulated)" })),
        )
            .into_response();
    }

    Json(json!({
        "userId": user_id,
        "recentActivity": ["login", "view_product", "purchase"],
        "loyaltyScore": loyalty_score,
    }))
    .into_response()
}
