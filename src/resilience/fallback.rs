//! Fallback resolver.
//!
//! Pure and infallible: it is the backstop that lets `fetch` always return a value.

use crate::config::FallbackConfig;
use crate::enrichment::result::{DegradeReason, Degraded, EnrichedDataStatus, EnrichmentResult};
use crate::resilience::retries::RetryError;

#[derive(Debug, Clone)]
pub struct FallbackResolver {
    message: String,
}

impl FallbackResolver {
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            message: config.message.clone(),
        }
    }

    pub fn resolve(&self, reason: DegradeReason) -> EnrichmentResult {
        EnrichmentResult::Degraded(Degraded {
            enriched_data_status: EnrichedDataStatus::Unavailable,
            message: self.message.clone(),
            reason,
        })
    }
}

impl Default for FallbackResolver {
    fn default() -> Self {
        Self::new(&FallbackConfig::default())
    }
}

impl From<RetryError> for DegradeReason {
    fn from(err: RetryError) -> Self {
        if err.exhausted {
            DegradeReason::RetriesExhausted {
                attempts: err.attempts,
                last: err.last,
            }
        } else {
            DegradeReason::NonRetryable(err.last)
        }
    }
}
