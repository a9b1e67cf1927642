//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the enrichment and health handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve until the shutdown broadcast fires
//!
//! Degraded enrichment is still a 200: unavailability is visible only in the
//! `enrichedDataStatus` field of the body.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::enrichment::{EnrichmentClient, EnrichmentResult};
use crate::lifecycle::shutdown;

/// Build the router for any enrichment client.
#[allow(deprecated)]
pub fn build_router<C: EnrichmentClient>(client: Arc<C>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/enrichment/{id}", get(enrichment_handler::<C>))
        .route("/health", get(health_handler))
        .with_state(client)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

async fn enrichment_handler<C: EnrichmentClient>(
    State(client): State<Arc<C>>,
    Path(identifier): Path<String>,
) -> Json<EnrichmentResult> {
    tracing::debug!(identifier = %identifier, "Fetching enrichment");
    Json(client.fetch(&identifier).await)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new<C: EnrichmentClient>(config: ServerConfig, client: Arc<C>) -> Self {
        let router = build_router(client, Duration::from_secs(config.request_timeout_secs));
        Self { router, config }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::StaticEnrichmentClient;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_live_result_is_upstream_body() {
        let client = Arc::new(StaticEnrichmentClient::new(EnrichmentResult::Live(
            json!({"userId": "42", "loyaltyScore": 90}),
        )));
        let router = build_router(client.clone(), Duration::from_secs(5));

        let (status, body) = get_json(router, "/enrichment/42").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"userId": "42", "loyaltyScore": 90}));
        assert_eq!(client.identifiers(), vec!["42".to_string()]);
    }

    #[tokio::test]
    async fn test_degraded_result_is_still_ok() {
        let client = Arc::new(StaticEnrichmentClient::unavailable());
        let router = build_router(client.clone(), Duration::from_secs(5));

        let (status, body) = get_json(router, "/enrichment/7").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["enrichedDataStatus"], "unavailable");
        assert!(body["message"].is_string());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_health() {
        let router = build_router(Arc::new(StaticEnrichmentClient::unavailable()), Duration::from_secs(5));
        let (status, body) = get_json(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "UP"}));
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let router = build_router(Arc::new(StaticEnrichmentClient::unavailable()), Duration::from_secs(5));
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
