//! Resilience types and error definitions.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors a single attempt against the upstream can end with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// The attempt exceeded its wall-clock budget and was cancelled.
    #[error("attempt timed out")]
    Timeout,

    /// Connection could not be established or broke mid-response.
    #[error("connection error: {0}")]
    Connection(String),

    /// Upstream answered with a 5xx status.
    #[error("upstream server error: HTTP {0}")]
    Server(u16),

    /// Upstream answered with a 4xx (or other non-2xx, non-5xx) status.
    #[error("upstream rejected request: HTTP {0}")]
    Client(u16),

    /// Body of a 2xx response was not valid JSON.
    #[error("invalid upstream payload: {0}")]
    Decode(String),
}

impl AttemptError {
    /// Default retry predicate: transient network-layer failures only.
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Timeout | AttemptError::Connection(_) => true,
            AttemptError::Server(status) => (500..600).contains(status),
            AttemptError::Client(_) | AttemptError::Decode(_) => false,
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Timeout => "timeout",
            AttemptError::Connection(_) => "connection_error",
            AttemptError::Server(_) => "server_error",
            AttemptError::Client(_) => "client_error",
            AttemptError::Decode(_) => "decode_error",
        }
    }
}

/// Result of one network round trip.
pub type AttemptResult = Result<Value, AttemptError>;

/// Outcome of one guarded call, as seen by the breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure(AttemptError),
}

impl CallOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CallOutcome::Failure(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure(e) => e.kind(),
        }
    }
}

/// Circuit breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakerState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        };
        f.write_str(name)
    }
}

/// Rejection returned by the breaker when a call is not permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit open for this endpoint")]
pub struct CircuitOpen;

/// Errors raised while constructing a client. Per-call failures never use this.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    InvalidBaseUrl(#[from] crate::config::ValidationError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
