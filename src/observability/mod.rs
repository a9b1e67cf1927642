//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Breakers publish BreakerEvents:
//!     → metrics.rs event recorder (transition counts, state gauge, outcomes)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Breaker internals are only observed through published events
//! - Metrics go through the `metrics` facade; no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
