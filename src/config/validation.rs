//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, percentages in range)
//! - Reject malformed URLs and addresses before any client is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.base_url '{url}' is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },

    #[error("breaker.window_span_ms ({span_ms}) must allow at least 1ms per bucket ({buckets} buckets)")]
    WindowTooShort { span_ms: u64, buckets: u32 },

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check that a base URL is an absolute http(s) URL that can take a path segment.
pub fn check_base_url(raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("URL has no host".to_string()));
    }
    Ok(url)
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = check_base_url(&config.upstream.base_url) {
        errors.push(e);
    }

    let non_zero = [
        ("upstream.attempt_timeout_ms", config.upstream.attempt_timeout_ms),
        ("upstream.guard_timeout_ms", config.upstream.guard_timeout_ms),
        ("retries.max_attempts", u64::from(config.retries.max_attempts)),
        ("breaker.volume_threshold", config.breaker.volume_threshold),
        ("breaker.reset_timeout_ms", config.breaker.reset_timeout_ms),
        ("breaker.window_buckets", u64::from(config.breaker.window_buckets)),
        ("server.request_timeout_secs", config.server.request_timeout_secs),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    let percent = u64::from(config.breaker.error_threshold_percent);
    if !(1..=100).contains(&percent) {
        errors.push(ValidationError::OutOfRange {
            field: "breaker.error_threshold_percent",
            min: 1,
            max: 100,
            value: percent,
        });
    }

    let jitter = u64::from(config.retries.jitter_percent);
    if jitter > 100 {
        errors.push(ValidationError::OutOfRange {
            field: "retries.jitter_percent",
            min: 0,
            max: 100,
            value: jitter,
        });
    }

    let buckets = config.breaker.window_buckets;
    if buckets > 0 && config.breaker.window_span_ms < u64::from(buckets) {
        errors.push(ValidationError::WindowTooShort {
            span_ms: config.breaker.window_span_ms,
            buckets,
        });
    }

    let addresses = [
        ("server.bind_address", &config.server.bind_address),
        ("observability.metrics_address", &config.observability.metrics_address),
    ];
    for (field, value) in addresses {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
