//! Scripted transport for exercising the resilience stack without sockets.

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::resilience::attempt::Transport;
use crate::resilience::types::{AttemptError, AttemptResult};

/// What the transport does on one call.
#[derive(Debug, Clone)]
pub enum Step {
    Ok(Value),
    Err(AttemptError),
    /// Sleep, then answer.
    Delay(Duration, AttemptResult),
    /// Never complete.
    Hang,
}

/// Plays back a script of responses; repeats the last step once exhausted.
#[derive(Debug)]
pub struct ScriptedTransport {
    endpoint: String,
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self::for_endpoint("http://scripted.test/enrich", steps)
    }

    pub fn for_endpoint(endpoint: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            script: Mutex::new(steps.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Gaps between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        let times = self.call_times.lock().unwrap();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    fn next_step(&self) -> Step {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        match script.pop_front() {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last.clone().unwrap_or(Step::Hang),
        }
    }
}

impl Transport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, _identifier: &str) -> AttemptResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());

        match self.next_step() {
            Step::Ok(value) => Ok(value),
            Step::Err(error) => Err(error),
            Step::Delay(delay, result) => {
                tokio::time::sleep(delay).await;
                result
            }
            Step::Hang => std::future::pending().await,
        }
    }
}
