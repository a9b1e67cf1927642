//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is retryable
//! - Re-run the attempt with exponential backoff, up to `max_attempts`
//! - Report the worst-case latency a guarded call can take
//!
//! # Design Decisions
//! - Pure exponential backoff by default; jitter is opt-in and bounded
//! - Timeouts, connection errors and 5xx retry; 4xx and decode errors do not
//! - Backoff sleeps suspend only the calling task

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::RetryConfig;
use crate::resilience::attempt::{AttemptExecutor, Transport};
use crate::resilience::backoff::{apply_jitter, calculate_backoff, max_jitter};
use crate::resilience::types::AttemptError;

/// Terminal failure of a retried call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{last} after {attempts} attempt(s)")]
pub struct RetryError {
    /// Attempts actually made.
    pub attempts: u32,
    /// Error of the final attempt.
    pub last: AttemptError,
    /// True when the error was retryable but attempts ran out.
    pub exhausted: bool,
}

/// Retry policy built once from configuration.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    jitter_percent: u8,
    retryable: fn(&AttemptError) -> bool,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("jitter_percent", &self.jitter_percent)
            .finish()
    }
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            jitter_percent: config.jitter_percent,
            retryable: AttemptError::is_retryable,
        }
    }

    /// Replace the retryable check.
    pub fn with_retryable_check(mut self, check: fn(&AttemptError) -> bool) -> Self {
        self.retryable = check;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff delays between attempts, without jitter.
    ///
    /// `max_attempts = 3, base = 100ms` gives `[100ms, 200ms]`.
    pub fn delays(&self) -> Vec<Duration> {
        (1..self.max_attempts)
            .map(|attempt| calculate_backoff(attempt, self.base_delay))
            .collect()
    }

    /// Upper bound on the time `execute` can take:
    /// `Σ delay(i) (+ max jitter) + max_attempts * per_attempt_timeout`.
    pub fn worst_case_latency(&self, per_attempt_timeout: Duration) -> Duration {
        let backoff = self
            .delays()
            .into_iter()
            .map(|d| d.saturating_add(max_jitter(d, self.jitter_percent)))
            .fold(Duration::ZERO, Duration::saturating_add);
        backoff.saturating_add(per_attempt_timeout.saturating_mul(self.max_attempts))
    }

    /// Run the attempt, retrying retryable failures.
    pub async fn execute<T: Transport>(
        &self,
        executor: &AttemptExecutor<T>,
        identifier: &str,
    ) -> Result<Value, RetryError> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let error = match executor.attempt(identifier).await {
                Ok(payload) => return Ok(payload),
                Err(e) => e,
            };

            if !(self.retryable)(&error) {
                tracing::debug!(attempt = attempts, error = %error, "Non-retryable failure");
                return Err(RetryError {
                    attempts,
                    last: error,
                    exhausted: false,
                });
            }

            if attempts >= self.max_attempts {
                return Err(RetryError {
                    attempts,
                    last: error,
                    exhausted: true,
                });
            }

            let delay = apply_jitter(calculate_backoff(attempts, self.base_delay), self.jitter_percent);
            tracing::info!(
                endpoint = %executor.transport().endpoint(),
                attempt = attempts,
                delay = ?delay,
                error = %error,
                "Retrying enrichment request"
            );
            crate::observability::metrics::record_retry(executor.transport().endpoint());
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::testing::{ScriptedTransport, Step};
    use serde_json::json;

    fn policy(max_attempts: u32, base_delay_ms: u64) -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_attempts,
            base_delay_ms,
            jitter_percent: 0,
        })
    }

    fn executor(steps: impl IntoIterator<Item = Step>) -> AttemptExecutor<ScriptedTransport> {
        AttemptExecutor::new(ScriptedTransport::new(steps), Duration::from_millis(1500))
    }

    #[test]
    fn test_delay_sequence() {
        assert_eq!(
            policy(3, 100).delays(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert_eq!(policy(1, 100).delays(), Vec::<Duration>::new());
        assert_eq!(policy(4, 50).delays().last(), Some(&Duration::from_millis(200)));
    }

    #[test]
    fn test_worst_case_latency_bound() {
        let bound = policy(3, 100).worst_case_latency(Duration::from_millis(1500));
        assert_eq!(bound, Duration::from_millis(100 + 200 + 3 * 1500));

        let jittered = RetryPolicy::new(&RetryConfig {
            max_attempts: 3,
            base_delay_ms: 100,
            jitter_percent: 10,
        });
        assert_eq!(
            jittered.worst_case_latency(Duration::from_millis(1500)),
            Duration::from_millis(110 + 220 + 3 * 1500)
        );
    }

    #[test]
    fn test_worst_case_latency_saturates_with_jitter() {
        let policy = RetryPolicy::new(&RetryConfig {
            max_attempts: 70,
            base_delay_ms: u64::MAX,
            jitter_percent: 50,
        });
        assert_eq!(policy.worst_case_latency(Duration::from_millis(1500)), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_exact_delays() {
        let exec = executor([
            Step::Err(AttemptError::Server(503)),
            Step::Err(AttemptError::Connection("reset".into())),
            Step::Ok(json!({"ok": true})),
        ]);

        let result = policy(3, 100).execute(&exec, "7").await;

        assert_eq!(result, Ok(json!({"ok": true})));
        assert_eq!(exec.transport().calls(), 3);
        assert_eq!(
            exec.transport().gaps(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_never_retried() {
        let exec = executor([Step::Err(AttemptError::Client(404))]);

        let err = policy(10, 100).execute(&exec, "7").await.unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(err.last, AttemptError::Client(404));
        assert!(!err.exhausted);
        assert_eq!(exec.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_error_never_retried() {
        let exec = executor([Step::Err(AttemptError::Decode("expected value".into()))]);

        let err = policy(3, 100).execute(&exec, "7").await.unwrap_err();
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let exec = executor([
            Step::Err(AttemptError::Server(500)),
            Step::Err(AttemptError::Server(502)),
            Step::Err(AttemptError::Server(503)),
        ]);

        let err = policy(3, 100).execute(&exec, "7").await.unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, AttemptError::Server(503));
        assert!(err.exhausted);
        assert_eq!(exec.transport().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_are_retried_within_bound() {
        let exec = executor([Step::Hang]);
        let policy = policy(3, 100);
        let bound = policy.worst_case_latency(exec.timeout());

        let start = tokio::time::Instant::now();
        let err = policy.execute(&exec, "7").await.unwrap_err();

        assert_eq!(err.last, AttemptError::Timeout);
        assert_eq!(exec.transport().calls(), 3);
        assert!(start.elapsed() <= bound + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retryable_check() {
        let exec = executor([Step::Err(AttemptError::Client(429)), Step::Ok(json!({}))]);
        let policy = policy(3, 100).with_retryable_check(|e| {
            e.is_retryable() || *e == AttemptError::Client(429)
        });

        assert!(policy.execute(&exec, "7").await.is_ok());
        assert_eq!(exec.transport().calls(), 2);
    }
}
