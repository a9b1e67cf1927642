//! Circuit breaker for the enrichment upstream.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: upstream assumed down, calls fail fast
//! - Half-Open: one probe call tests whether the upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: calls in window >= volume_threshold
//!                AND failure % >= error_threshold_percent
//! Open → Half-Open: reset timeout elapsed (checked lazily on the next call)
//! Half-Open → Closed: probe succeeds (window cleared)
//! Half-Open → Open: probe fails (reset timer restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per endpoint, shared by all concurrent callers
//! - State, window and probe flag sit behind a single mutex
//! - Rejected calls are never recorded as failures
//! - Results of calls admitted before a transition do not move the state machine

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::resilience::events::BreakerEvent;
use crate::resilience::types::{AttemptError, BreakerState, CallOutcome, CircuitOpen};
use crate::resilience::window::RollingWindow;

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    window: RollingWindow,
}

/// Percentage/volume circuit breaker for one endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    endpoint: Arc<str>,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
    events: broadcast::Sender<BreakerEvent>,
}

impl CircuitBreaker {
    pub fn new(
        endpoint: impl Into<Arc<str>>,
        config: BreakerConfig,
        events: broadcast::Sender<BreakerEvent>,
    ) -> Self {
        let window = RollingWindow::new(config.window_span(), config.window_buckets);
        Self {
            endpoint: endpoint.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                opened_at: None,
                probe_in_flight: false,
                window,
            }),
            events,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current state, for diagnostics. Does not apply the lazy Open → Half-Open check.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Ask to make a call.
    ///
    /// Returns a permit that must be settled with the call's outcome, or
    /// `CircuitOpen` when the call is rejected. In Half-Open exactly one permit
    /// (the probe) is handed out until it is settled or dropped.
    pub fn try_acquire(self: &Arc<Self>) -> Result<CallPermit, CircuitOpen> {
        let mut events = Vec::new();

        let decision = {
            let mut inner = self.lock();
            let now = Instant::now();

            if inner.state == BreakerState::Open {
                let elapsed = inner
                    .opened_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                if elapsed >= self.config.reset_timeout() {
                    events.push(self.transition(&mut inner, BreakerState::HalfOpen, now));
                }
            }

            match inner.state {
                BreakerState::Closed => Ok(false),
                BreakerState::HalfOpen if !inner.probe_in_flight => {
                    inner.probe_in_flight = true;
                    Ok(true)
                }
                _ => Err(CircuitOpen),
            }
        };

        if decision.is_err() {
            tracing::debug!(endpoint = %self.endpoint, "Circuit breaker rejected call");
            events.push(BreakerEvent::Rejected {
                endpoint: self.endpoint.clone(),
            });
        }
        self.publish(events);

        decision.map(|probe| CallPermit {
            breaker: self.clone(),
            probe,
            settled: false,
        })
    }

    fn settle(&self, probe: bool, outcome: CallOutcome) {
        let mut events = Vec::with_capacity(2);

        {
            let mut inner = self.lock();
            // read under the lock so window timestamps arrive in order
            let now = Instant::now();
            match (inner.state, probe) {
                (BreakerState::HalfOpen, true) => {
                    let to = if outcome.is_failure() {
                        BreakerState::Open
                    } else {
                        BreakerState::Closed
                    };
                    events.push(self.transition(&mut inner, to, now));
                }
                (BreakerState::Closed, false) => {
                    inner.window.record_at(&outcome, now);
                    let stats = inner.window.stats_at(now);
                    if stats.total >= self.config.volume_threshold
                        && stats.meets_percent(self.config.error_threshold_percent)
                    {
                        tracing::warn!(
                            endpoint = %self.endpoint,
                            failures = stats.failures,
                            total = stats.total,
                            threshold_percent = self.config.error_threshold_percent,
                            "Failure ratio exceeded threshold"
                        );
                        events.push(self.transition(&mut inner, BreakerState::Open, now));
                    }
                }
                (state, _) => {
                    tracing::debug!(
                        endpoint = %self.endpoint,
                        state = %state,
                        "Ignoring outcome of call admitted before last transition"
                    );
                }
            }
        }

        events.insert(
            0,
            BreakerEvent::CallRecorded {
                endpoint: self.endpoint.clone(),
                outcome,
                probe,
            },
        );
        self.publish(events);
    }

    /// A permit went away without an outcome (caller cancelled).
    fn abandon(&self, probe: bool) {
        if !probe {
            return;
        }
        let mut inner = self.lock();
        if inner.state == BreakerState::HalfOpen {
            inner.probe_in_flight = false;
            tracing::debug!(endpoint = %self.endpoint, "Probe abandoned, slot released");
        }
    }

    /// The only place the state changes.
    fn transition(&self, inner: &mut BreakerInner, to: BreakerState, now: Instant) -> BreakerEvent {
        let from = inner.state;
        inner.state = to;
        inner.probe_in_flight = false;

        match to {
            BreakerState::Open => {
                inner.opened_at = Some(now);
                tracing::warn!(endpoint = %self.endpoint, from = %from, "Circuit breaker OPEN");
            }
            BreakerState::HalfOpen => {
                tracing::warn!(endpoint = %self.endpoint, "Circuit breaker HALF-OPEN");
            }
            BreakerState::Closed => {
                inner.opened_at = None;
                inner.window.clear();
                tracing::info!(endpoint = %self.endpoint, "Circuit breaker CLOSED");
            }
        }

        BreakerEvent::StateChanged {
            endpoint: self.endpoint.clone(),
            from,
            to,
        }
    }

    fn publish(&self, events: Vec<BreakerEvent>) {
        for event in events {
            // no subscribers is fine
            let _ = self.events.send(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission to make one guarded call.
///
/// Dropping it without recording counts as cancellation: nothing is recorded,
/// and a probe permit frees the Half-Open slot.
#[derive(Debug)]
#[must_use = "a permit must be settled with the call outcome"]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    probe: bool,
    settled: bool,
}

impl CallPermit {
    /// True when this call is the Half-Open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record(mut self, outcome: CallOutcome) {
        self.settled = true;
        self.breaker.settle(self.probe, outcome);
    }

    pub fn success(self) {
        self.record(CallOutcome::Success);
    }

    pub fn failure(self, error: AttemptError) {
        self.record(CallOutcome::Failure(error));
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.abandon(self.probe);
        }
    }
}
