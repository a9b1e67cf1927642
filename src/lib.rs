//! Resilient enrichment gateway library.
//!
//! Wraps calls to an unreliable enrichment service with per-attempt timeouts,
//! exponential-backoff retries, a percentage/volume circuit breaker and a
//! deterministic fallback, so `fetch` always returns a typed result.

pub mod config;
pub mod enrichment;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use enrichment::{EnrichmentClient, EnrichmentResult, ResilientClient};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::BreakerRegistry;
