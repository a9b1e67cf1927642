//! Single-attempt execution with a hard timeout.
//!
//! # Responsibilities
//! - Perform exactly one round trip to the upstream
//! - Classify the response into the attempt error taxonomy
//! - Cancel the in-flight operation when the per-attempt deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future cancels the request
//! - The deadline fires even if the transport never completes
//! - No retry logic lives here

use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::config::validation::check_base_url;
use crate::resilience::types::{AttemptError, AttemptResult, BuildError};

/// One outbound network operation, keyed by identifier.
pub trait Transport: Send + Sync + 'static {
    /// Endpoint identity used to pick the breaker for this transport.
    fn endpoint(&self) -> &str;

    /// Perform a single request for `identifier`.
    fn get(&self, identifier: &str) -> impl Future<Output = AttemptResult> + Send;
}

/// `GET {base_url}/{identifier}` over reqwest, expecting a JSON body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport, failing fast on a malformed base URL.
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, BuildError> {
        let base_url = check_base_url(base_url)?;
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        let endpoint = base_url.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            endpoint,
        })
    }

    /// URL for one identifier; the identifier is percent-encoded as a single segment.
    pub fn url_for(&self, identifier: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(identifier);
        }
        url
    }
}

impl Transport for HttpTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, identifier: &str) -> AttemptResult {
        let response = self
            .client
            .get(self.url_for(identifier))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AttemptError::Server(status.as_u16()));
        }
        if !status.is_success() {
            return Err(AttemptError::Client(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify_transport_error)?;
        serde_json::from_slice(&body).map_err(|e| AttemptError::Decode(e.to_string()))
    }
}

fn classify_transport_error(err: reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Timeout
    } else {
        AttemptError::Connection(err.to_string())
    }
}

/// Wraps a transport with the per-attempt deadline.
#[derive(Debug)]
pub struct AttemptExecutor<T> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> AttemptExecutor<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Run one attempt. Exceeding the deadline yields `Err(Timeout)`.
    pub async fn attempt(&self, identifier: &str) -> AttemptResult {
        match timeout(self.timeout, self.transport.get(identifier)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(
                    endpoint = %self.transport.endpoint(),
                    timeout = ?self.timeout,
                    "Attempt timed out"
                );
                Err(AttemptError::Timeout)
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
