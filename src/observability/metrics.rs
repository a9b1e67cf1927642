//! Metrics collection and exposition.
//!
//! # Metrics
//! - `enrichment_fetch_total` (counter): guarded calls by endpoint, result
//! - `enrichment_fetch_duration_seconds` (histogram): time to return a result
//! - `enrichment_retries_total` (counter): backoff-and-retry cycles by endpoint
//! - `enrichment_degraded_total` (counter): fallback results by reason
//! - `enrichment_calls_total` (counter): outcomes recorded by breakers
//! - `enrichment_breaker_rejections_total` (counter): calls rejected while open
//! - `enrichment_breaker_transitions_total` (counter): state changes by from/to
//! - `enrichment_breaker_state` (gauge): 0=closed, 1=open, 2=half-open

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::resilience::events::BreakerEvent;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_fetch(endpoint: &str, result: &'static str, elapsed: Duration) {
    counter!("enrichment_fetch_total", "endpoint" => endpoint.to_string(), "result" => result)
        .increment(1);
    histogram!("enrichment_fetch_duration_seconds", "result" => result).record(elapsed.as_secs_f64());
}

pub fn record_retry(endpoint: &str) {
    counter!("enrichment_retries_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_degraded(reason: &'static str) {
    counter!("enrichment_degraded_total", "reason" => reason).increment(1);
}

/// Translate one breaker event into metrics.
pub fn record_breaker_event(event: &BreakerEvent) {
    let endpoint = event.endpoint().to_string();
    match event {
        BreakerEvent::StateChanged { from, to, .. } => {
            counter!(
                "enrichment_breaker_transitions_total",
                "endpoint" => endpoint.clone(),
                "from" => from.to_string(),
                "to" => to.to_string()
            )
            .increment(1);
            gauge!("enrichment_breaker_state", "endpoint" => endpoint).set(f64::from(*to as u8));
        }
        BreakerEvent::CallRecorded { outcome, .. } => {
            counter!("enrichment_calls_total", "endpoint" => endpoint, "outcome" => outcome.label())
                .increment(1);
        }
        BreakerEvent::Rejected { .. } => {
            counter!("enrichment_breaker_rejections_total", "endpoint" => endpoint).increment(1);
        }
    }
}

/// Consume breaker events until every sender is gone.
pub fn spawn_event_recorder(mut events: broadcast::Receiver<BreakerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => record_breaker_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Breaker event recorder lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("Breaker event recorder stopped");
    })
}
