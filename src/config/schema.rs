//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the enrichment gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound HTTP server settings.
    pub server: ServerConfig,

    /// The enrichment service being called.
    pub upstream: UpstreamConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Circuit breaker and rolling window settings.
    pub breaker: BreakerConfig,

    /// Degraded response settings.
    pub fallback: FallbackConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Inbound HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for one inbound request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Upstream enrichment service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL; the identifier is appended as the last path segment.
    pub base_url: String,

    /// Hard wall-clock limit for a single attempt in milliseconds.
    pub attempt_timeout_ms: u64,

    /// Limit for the whole guarded call (all attempts and backoff) in milliseconds.
    pub guard_timeout_ms: u64,
}

impl UpstreamConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn guard_timeout(&self) -> Duration {
        Duration::from_millis(self.guard_timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081/enrich".to_string(),
            attempt_timeout_ms: 1500,
            guard_timeout_ms: 3000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per guarded call, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each later attempt.
    pub base_delay_ms: u64,

    /// Extra random delay as a percentage of the computed backoff (0 disables).
    pub jitter_percent: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            jitter_percent: 0,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Minimum calls in the window before the failure ratio is trusted.
    pub volume_threshold: u64,

    /// Failure percentage (of calls in the window) that opens the circuit.
    pub error_threshold_percent: u8,

    /// Time spent Open before a probe is allowed, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Length of the rolling window in milliseconds.
    pub window_span_ms: u64,

    /// Number of buckets the window is divided into.
    pub window_buckets: u32,
}

impl BreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn window_span(&self) -> Duration {
        Duration::from_millis(self.window_span_ms)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            volume_threshold: 5,
            error_threshold_percent: 50,
            reset_timeout_ms: 30_000,
            window_span_ms: 10_000,
            window_buckets: 10,
        }
    }
}

/// Degraded response configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Human-readable message returned with every degraded result.
    pub message: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            message: "External service is currently unavailable. Showing basic profile."
                .to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
