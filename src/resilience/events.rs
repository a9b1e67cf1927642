//! Breaker observability events.
//!
//! Breakers publish on a broadcast channel; logging and metrics subscribe.
//! Publishing never blocks and is silently dropped when nobody listens.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::resilience::types::{BreakerState, CallOutcome};

/// Capacity of the event channel. Slow subscribers see `Lagged` and skip ahead.
pub const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum BreakerEvent {
    StateChanged {
        endpoint: Arc<str>,
        from: BreakerState,
        to: BreakerState,
    },
    CallRecorded {
        endpoint: Arc<str>,
        outcome: CallOutcome,
        probe: bool,
    },
    Rejected {
        endpoint: Arc<str>,
    },
}

impl BreakerEvent {
    pub fn endpoint(&self) -> &str {
        match self {
            BreakerEvent::StateChanged { endpoint, .. }
            | BreakerEvent::CallRecorded { endpoint, .. }
            | BreakerEvent::Rejected { endpoint } => endpoint,
        }
    }
}

pub fn channel() -> (broadcast::Sender<BreakerEvent>, broadcast::Receiver<BreakerEvent>) {
    broadcast::channel(EVENT_CAPACITY)
}
