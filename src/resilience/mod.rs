//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Guarded call for one identifier:
//!     → circuit_breaker.rs (gate: Closed passes, Open rejects, Half-Open admits one probe)
//!     → retries.rs (0..N attempts, exponential backoff from backoff.rs)
//!     → attempt.rs (one round trip with a hard timeout)
//!     → outcome recorded into window.rs via the breaker permit
//!     → fallback.rs only on terminal failure or rejection
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - One breaker per endpoint, held in registry.rs, never global
//! - Breaker transitions are published as events.rs events for logging/metrics

pub mod attempt;
pub mod backoff;
pub mod circuit_breaker;
pub mod events;
pub mod fallback;
pub mod registry;
pub mod retries;
pub mod types;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use attempt::{AttemptExecutor, HttpTransport, Transport};
pub use circuit_breaker::{CallPermit, CircuitBreaker};
pub use events::BreakerEvent;
pub use fallback::FallbackResolver;
pub use registry::BreakerRegistry;
pub use retries::{RetryError, RetryPolicy};
pub use types::{AttemptError, AttemptResult, BreakerState, BuildError, CallOutcome, CircuitOpen};
pub use window::{RollingWindow, WindowStats};
