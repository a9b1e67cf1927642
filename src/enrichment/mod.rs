//! Enrichment subsystem.
//!
//! # Data Flow
//! ```text
//! fetch(identifier)
//!     → client.rs (ResilientClient: breaker gate, retry under guard timeout)
//!     → resilience/* (attempt, retry, breaker accounting, fallback)
//!     → result.rs (Live payload or Degraded { enrichedDataStatus, message })
//! ```
//!
//! # Design Decisions
//! - Callers depend on the `EnrichmentClient` trait, not the concrete client
//! - stub.rs provides a fixed-result double for handler and service tests

pub mod client;
pub mod result;
pub mod stub;

pub use client::{EnrichmentClient, ResilientClient};
pub use result::{DegradeReason, Degraded, EnrichedDataStatus, EnrichmentResult};
pub use stub::StaticEnrichmentClient;
