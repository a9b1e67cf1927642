//! Resilient enrichment client.
//!
//! # Responsibilities
//! - Gate each call through the endpoint's circuit breaker
//! - Run the retry policy under an overall deadline
//! - Settle the breaker permit with the call's outcome
//! - Turn every terminal failure into a degraded result
//!
//! # Design Decisions
//! - `fetch` has no error path; unavailability is a typed result
//! - Dropping a `fetch` future mid-flight cancels the attempt and records nothing
//! - Construction is the only fallible step (malformed URL fails fast)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

use crate::config::GatewayConfig;
use crate::enrichment::result::{DegradeReason, EnrichmentResult};
use crate::observability::metrics;
use crate::resilience::{
    AttemptError, AttemptExecutor, BreakerRegistry, BuildError, CircuitBreaker, FallbackResolver,
    HttpTransport, RetryPolicy, Transport,
};

/// Source of enrichment data for one identifier.
pub trait EnrichmentClient: Send + Sync + 'static {
    fn fetch(&self, identifier: &str) -> impl Future<Output = EnrichmentResult> + Send;
}

/// Production client: breaker → retry → attempt, with fallback on every failure path.
#[derive(Debug)]
pub struct ResilientClient<T> {
    executor: AttemptExecutor<T>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    fallback: FallbackResolver,
    guard_timeout: Duration,
}

impl ResilientClient<HttpTransport> {
    /// Build the HTTP client for `config.upstream.base_url`.
    pub fn from_config(config: &GatewayConfig, registry: &BreakerRegistry) -> Result<Self, BuildError> {
        let transport = HttpTransport::new(&config.upstream.base_url, config.upstream.attempt_timeout())?;
        Ok(Self::with_transport(transport, config, registry))
    }
}

impl<T: Transport> ResilientClient<T> {
    /// Wrap an arbitrary transport; the breaker is looked up by the transport's endpoint.
    pub fn with_transport(transport: T, config: &GatewayConfig, registry: &BreakerRegistry) -> Self {
        let breaker = registry.breaker_for(transport.endpoint());
        let client = Self {
            executor: AttemptExecutor::new(transport, config.upstream.attempt_timeout()),
            retry: RetryPolicy::new(&config.retries),
            breaker,
            fallback: FallbackResolver::new(&config.fallback),
            guard_timeout: config.upstream.guard_timeout(),
        };

        tracing::info!(
            endpoint = %client.breaker.endpoint(),
            attempt_timeout = ?client.executor.timeout(),
            guard_timeout = ?client.guard_timeout,
            max_attempts = client.retry.max_attempts(),
            worst_case = ?client.worst_case_latency(),
            "Enrichment client ready"
        );
        client
    }

    /// Longest `fetch` can take before it returns.
    pub fn worst_case_latency(&self) -> Duration {
        self.retry
            .worst_case_latency(self.executor.timeout())
            .min(self.guard_timeout)
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn transport(&self) -> &T {
        self.executor.transport()
    }

    fn degrade(&self, identifier: &str, reason: DegradeReason) -> EnrichmentResult {
        tracing::warn!(
            endpoint = %self.breaker.endpoint(),
            identifier = %identifier,
            reason = %reason,
            "Serving degraded enrichment"
        );
        metrics::record_degraded(reason.label());
        self.fallback.resolve(reason)
    }
}

impl<T: Transport> EnrichmentClient for ResilientClient<T> {
    async fn fetch(&self, identifier: &str) -> EnrichmentResult {
        let start = Instant::now();

        let permit = match self.breaker.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                let result = self.degrade(identifier, DegradeReason::CircuitOpen);
                metrics::record_fetch(self.breaker.endpoint(), "rejected", start.elapsed());
                return result;
            }
        };

        let (result, label) = match timeout(self.guard_timeout, self.retry.execute(&self.executor, identifier)).await {
            Ok(Ok(payload)) => {
                permit.success();
                (EnrichmentResult::Live(payload), "live")
            }
            Ok(Err(err)) => {
                permit.failure(err.last.clone());
                (self.degrade(identifier, err.into()), "degraded")
            }
            Err(_) => {
                permit.failure(AttemptError::Timeout);
                (self.degrade(identifier, DegradeReason::Timeout), "degraded")
            }
        };

        metrics::record_fetch(self.breaker.endpoint(), label, start.elapsed());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::testing::{ScriptedTransport, Step};
    use crate::resilience::BreakerState;
    use serde_json::json;

    fn config(max_attempts: u32, volume_threshold: u64) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.retries.max_attempts = max_attempts;
        config.breaker.volume_threshold = volume_threshold;
        config.breaker.error_threshold_percent = 50;
        config.breaker.reset_timeout_ms = 1_000;
        config
    }

    fn client(
        config: &GatewayConfig,
        steps: impl IntoIterator<Item = Step>,
    ) -> ResilientClient<ScriptedTransport> {
        let registry = BreakerRegistry::new(config.breaker.clone());
        ResilientClient::with_transport(ScriptedTransport::new(steps), config, &registry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_payload_passes_through() {
        let client = client(&config(3, 5), [Step::Ok(json!({"loyaltyScore": 88}))]);

        let result = client.fetch("u1").await;

        assert_eq!(result, EnrichmentResult::Live(json!({"loyaltyScore": 88})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let client = client(
            &config(3, 5),
            [
                Step::Err(AttemptError::Server(503)),
                Step::Err(AttemptError::Timeout),
                Step::Ok(json!({"ok": 1})),
            ],
        );

        assert!(client.fetch("u1").await.is_live());
        assert_eq!(client.transport().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_degrades_without_retry() {
        let client = client(&config(5, 5), [Step::Err(AttemptError::Client(404))]);

        let result = client.fetch("missing").await;

        assert_eq!(
            result.degrade_reason(),
            Some(&DegradeReason::NonRetryable(AttemptError::Client(404)))
        );
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_skips_network() {
        let client = client(
            &config(1, 5),
            [
                Step::Err(AttemptError::Server(500)),
                Step::Err(AttemptError::Server(500)),
                Step::Err(AttemptError::Server(500)),
                Step::Ok(json!({})),
                Step::Ok(json!({})),
            ],
        );

        for _ in 0..5 {
            client.fetch("u1").await;
        }
        assert_eq!(client.breaker().state(), BreakerState::Open);

        for _ in 0..3 {
            let result = client.fetch("u1").await;
            assert_eq!(result.degrade_reason(), Some(&DegradeReason::CircuitOpen));
        }
        assert_eq!(client.transport().calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_never_fails_for_any_error() {
        let errors = [
            AttemptError::Timeout,
            AttemptError::Connection("refused".into()),
            AttemptError::Server(502),
            AttemptError::Client(400),
            AttemptError::Decode("eof".into()),
        ];

        for error in errors {
            let client = client(&config(2, 100), [Step::Err(error.clone())]);
            let result = client.fetch("u1").await;
            assert!(result.is_degraded(), "{:?} should degrade", error);
            let body = serde_json::to_value(&result).unwrap();
            assert_eq!(body["enrichedDataStatus"], "unavailable");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_timeout_bounds_latency() {
        let client = client(&config(3, 100), [Step::Hang]);
        assert_eq!(client.worst_case_latency(), Duration::from_millis(3000));

        let start = Instant::now();
        let result = client.fetch("slow").await;

        assert_eq!(result.degrade_reason(), Some(&DegradeReason::Timeout));
        assert!(start.elapsed() <= Duration::from_millis(3010));
        assert_eq!(client.transport().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_single_probe() {
        let client = client(
            &config(1, 1),
            [
                Step::Err(AttemptError::Server(500)),
                Step::Delay(Duration::from_millis(100), Ok(json!({"probe": true}))),
            ],
        );

        client.fetch("u1").await;
        assert_eq!(client.breaker().state(), BreakerState::Open);
        tokio::time::advance(Duration::from_secs(1)).await;

        let (probe, concurrent) = tokio::join!(client.fetch("u1"), async {
            tokio::task::yield_now().await;
            client.fetch("u2").await
        });

        assert!(probe.is_live());
        assert_eq!(concurrent.degrade_reason(), Some(&DegradeReason::CircuitOpen));
        assert_eq!(client.transport().calls(), 2);
        assert_eq!(client.breaker().state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_probe_does_not_wedge_breaker() {
        let client = client(
            &config(1, 1),
            [Step::Err(AttemptError::Server(500)), Step::Hang, Step::Ok(json!({}))],
        );

        client.fetch("u1").await;
        tokio::time::advance(Duration::from_secs(1)).await;

        let cancelled = timeout(Duration::from_millis(50), client.fetch("u1")).await;
        assert!(cancelled.is_err());
        assert_eq!(client.breaker().state(), BreakerState::HalfOpen);

        assert!(client.fetch("u1").await.is_live());
        assert_eq!(client.breaker().state(), BreakerState::Closed);
    }
}
