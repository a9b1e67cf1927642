//! Per-endpoint breaker registry.
//!
//! Owned by whoever builds clients; breakers live as long as the registry.
//! Distinct endpoints never share breaker state.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::BreakerConfig;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::events::{self, BreakerEvent};

#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: BreakerConfig,
    events: broadcast::Sender<BreakerEvent>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        let (events, _) = events::channel();
        Self {
            breakers: DashMap::new(),
            config,
            events,
        }
    }

    /// Breaker for `endpoint`, created on first use.
    pub fn breaker_for(&self, endpoint: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                tracing::debug!(endpoint = %endpoint, "Creating circuit breaker");
                Arc::new(CircuitBreaker::new(
                    endpoint,
                    self.config.clone(),
                    self.events.clone(),
                ))
            })
            .clone()
    }

    /// Receive events from every breaker in this registry.
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::types::{AttemptError, BreakerState};

    #[tokio::test]
    async fn test_same_endpoint_same_breaker() {
        let registry = BreakerRegistry::new(BreakerConfig::default());
        let a = registry.breaker_for("http://a.test/enrich");
        let b = registry.breaker_for("http://a.test/enrich");

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_endpoints_are_isolated() {
        let registry = BreakerRegistry::new(BreakerConfig {
            volume_threshold: 1,
            ..BreakerConfig::default()
        });
        let a = registry.breaker_for("http://a.test/enrich");
        let b = registry.breaker_for("http://b.test/enrich");

        a.try_acquire().unwrap().failure(AttemptError::Server(500));

        assert_eq!(a.state(), BreakerState::Open);
        assert_eq!(b.state(), BreakerState::Closed);
        assert!(b.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn test_subscribers_see_all_endpoints() {
        let registry = BreakerRegistry::new(BreakerConfig::default());
        let mut rx = registry.subscribe();

        registry.breaker_for("http://a.test").try_acquire().unwrap().success();
        registry.breaker_for("http://b.test").try_acquire().unwrap().success();

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.endpoint(), "http://a.test");
        assert_eq!(second.endpoint(), "http://b.test");
    }
}
