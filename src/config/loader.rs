//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable {key} has invalid value '{value}'")]
    Env { key: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build the effective configuration: optional file, then process environment,
/// then validation.
pub fn load_from_env(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the recognised environment variables on top of `config`.
///
/// Unknown keys are ignored. A recognised key with an unparsable value is an
/// error rather than a silent fallback to the default.
pub fn apply_env_overrides<I, K, V>(config: &mut GatewayConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in vars {
        let (key, value) = (key.as_ref(), value.as_ref());
        match key {
            "EXTERNAL_SERVICE_URL" => config.upstream.base_url = value.to_string(),
            "EXTERNAL_SERVICE_TIMEOUT_MS" => {
                config.upstream.attempt_timeout_ms = parse_var(key, value)?
            }
            "EXTERNAL_SERVICE_GUARD_TIMEOUT_MS" => {
                config.upstream.guard_timeout_ms = parse_var(key, value)?
            }
            "RETRY_MAX_ATTEMPTS" => config.retries.max_attempts = parse_var(key, value)?,
            "RETRY_BASE_DELAY_MS" => config.retries.base_delay_ms = parse_var(key, value)?,
            "RETRY_JITTER_PERCENT" => config.retries.jitter_percent = parse_var(key, value)?,
            "CIRCUIT_BREAKER_FAILURE_THRESHOLD" => {
                config.breaker.volume_threshold = parse_var(key, value)?
            }
            "CIRCUIT_BREAKER_ERROR_PERCENT" => {
                config.breaker.error_threshold_percent = parse_var(key, value)?
            }
            "CIRCUIT_BREAKER_RESET_TIMEOUT_MS" => {
                config.breaker.reset_timeout_ms = parse_var(key, value)?
            }
            "CIRCUIT_BREAKER_WINDOW_MS" => config.breaker.window_span_ms = parse_var(key, value)?,
            "CIRCUIT_BREAKER_WINDOW_BUCKETS" => {
                config.breaker.window_buckets = parse_var(key, value)?
            }
            "PORT" => {
                let port: u16 = parse_var(key, value)?;
                let host = config
                    .server
                    .bind_address
                    .rsplit_once(':')
                    .map(|(host, _)| host.to_string())
                    .unwrap_or_else(|| "0.0.0.0".to_string());
                config.server.bind_address = format!("{}:{}", host, port);
            }
            "LOG_LEVEL" => config.observability.log_level = value.to_string(),
            _ => {}
        }
    }
    Ok(())
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}
