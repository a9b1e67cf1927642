//! Test double for code that depends on `EnrichmentClient`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::enrichment::client::EnrichmentClient;
use crate::enrichment::result::{DegradeReason, EnrichmentResult};
use crate::resilience::FallbackResolver;

/// Returns the same result for every identifier and remembers what was asked.
#[derive(Debug)]
pub struct StaticEnrichmentClient {
    result: EnrichmentResult,
    calls: AtomicUsize,
    identifiers: Mutex<Vec<String>>,
}

impl StaticEnrichmentClient {
    pub fn new(result: EnrichmentResult) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
            identifiers: Mutex::new(Vec::new()),
        }
    }

    /// A client that always reports the upstream as unavailable.
    pub fn unavailable() -> Self {
        Self::new(FallbackResolver::default().resolve(DegradeReason::CircuitOpen))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.identifiers
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

impl EnrichmentClient for StaticEnrichmentClient {
    async fn fetch(&self, identifier: &str) -> EnrichmentResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut ids) = self.identifiers.lock() {
            ids.push(identifier.to_string());
        }
        self.result.clone()
    }
}
