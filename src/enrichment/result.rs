//! Enrichment results handed back to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::resilience::types::AttemptError;

/// What `fetch` returns. Upstream unavailability is a value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnrichmentResult {
    /// Payload from the upstream, passed through untouched.
    Live(Value),
    /// Substitute produced by the fallback resolver.
    Degraded(Degraded),
}

impl EnrichmentResult {
    pub fn is_live(&self) -> bool {
        matches!(self, EnrichmentResult::Live(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, EnrichmentResult::Degraded(_))
    }

    pub fn degrade_reason(&self) -> Option<&DegradeReason> {
        match self {
            EnrichmentResult::Live(_) => None,
            EnrichmentResult::Degraded(d) => Some(&d.reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichedDataStatus {
    Unavailable,
}

/// Degraded payload: `{ "enrichedDataStatus": "unavailable", "message": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Degraded {
    pub enriched_data_status: EnrichedDataStatus,
    pub message: String,
    /// Kept for logs and metrics; not part of the wire format.
    #[serde(skip)]
    pub reason: DegradeReason,
}

/// Why a result was degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    /// The breaker rejected the call; no attempt was made.
    CircuitOpen,
    /// Every attempt failed with a retryable error.
    RetriesExhausted { attempts: u32, last: AttemptError },
    /// An attempt failed with an error that is never retried.
    NonRetryable(AttemptError),
    /// The guarded call exceeded its overall deadline.
    Timeout,
}

impl DegradeReason {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DegradeReason::CircuitOpen => "circuit_open",
            DegradeReason::RetriesExhausted { .. } => "retries_exhausted",
            DegradeReason::NonRetryable(_) => "non_retryable",
            DegradeReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::CircuitOpen => write!(f, "circuit open"),
            DegradeReason::RetriesExhausted { attempts, last } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, last)
            }
            DegradeReason::NonRetryable(e) => write!(f, "non-retryable failure: {}", e),
            DegradeReason::Timeout => write!(f, "guarded call timed out"),
        }
    }
}
