//! HTTP metrics sink with exponential-backoff retry.
//!
//! [`HttpMetricsSink`] POSTs a JSON-encoded [`MetricBatch`] to the metrics
//! backend, authenticating with a bearer API key. Transient failures
//! (network errors, HTTP 429, HTTP 5xx) are retried up to three times with
//! exponential backoff (1 s, 2 s, 4 s). Other HTTP errors fail at once.

use std::time::Duration;

use async_trait::async_trait;

use super::{MetricBatch, MetricsSink, RecordingError};

/// Retry delays (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// HttpSinkConfig
// ---------------------------------------------------------------------------

/// Connection settings for the metrics backend.
#[derive(Clone)]
pub struct HttpSinkConfig {
    /// Ingest URL the batches are POSTed to.
    pub endpoint: String,
    /// Bearer token for the backend.
    pub api_key: String,
}

impl std::fmt::Debug for HttpSinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSinkConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl HttpSinkConfig {
    /// Read the backend credentials through `lookup` (normally the process
    /// environment).
    ///
    /// Returns `None` if either credential is missing or empty, signalling
    /// that the agent should run with a degraded recorder.
    ///
    /// | Variable           | Required |
    /// |--------------------|----------|
    /// | `METRICS_ENDPOINT` | yes      |
    /// | `METRICS_API_KEY`  | yes      |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Some(Self {
            endpoint: non_empty("METRICS_ENDPOINT")?,
            api_key: non_empty("METRICS_API_KEY")?,
        })
    }
}

// ---------------------------------------------------------------------------
// HttpMetricsSink
// ---------------------------------------------------------------------------

/// Delivers metric batches to the backend over HTTP.
pub struct HttpMetricsSink {
    client: reqwest::Client,
    config: HttpSinkConfig,
    retry_delays: Vec<Duration>,
}

impl HttpMetricsSink {
    /// Create a sink with a pre-configured HTTP client.
    pub fn new(config: HttpSinkConfig) -> Result<Self, RecordingError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            config,
            retry_delays: RETRY_DELAYS.to_vec(),
        })
    }

    /// Override the backoff schedule. An empty schedule disables retries.
    pub fn with_retry_delays(mut self, delays: impl Into<Vec<Duration>>) -> Self {
        self.retry_delays = delays.into();
        self
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, batch: &MetricBatch) -> Result<(), RecordingError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(batch)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RecordingError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Network failures, throttling and server errors may succeed on retry.
fn is_transient(err: &RecordingError) -> bool {
    match err {
        RecordingError::Request(_) => true,
        RecordingError::HttpStatus(status) => *status == 429 || *status >= 500,
        RecordingError::Encode(_) => false,
    }
}

#[async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn put_metric_data(&self, batch: &MetricBatch) -> Result<(), RecordingError> {
        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(batch).await {
                Ok(()) => return Ok(()),
                Err(e) if is_transient(&e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        endpoint = %self.config.endpoint,
                        error = %e,
                        "Metrics delivery attempt failed, retrying",
                    );
                    tokio::time::sleep(*delay).await;
                }
                Err(e) => {
                    tracing::error!(endpoint = %self.config.endpoint, error = %e, "Metrics delivery rejected");
                    return Err(e);
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(batch).await.inspect_err(|e| {
            tracing::error!(
                endpoint = %self.config.endpoint,
                error = %e,
                "Metrics delivery failed after all retries",
            );
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
