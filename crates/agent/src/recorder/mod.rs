//! Recorder capability and metrics payload.
//!
//! A [`Recorder`] takes one finalized [`Measurement`] and forwards it.
//! The real recorder ([`MetricsRecorder`]) converts the measurement into
//! two named datums (temperature, humidity), each tagged with the
//! measurement source as a dimension, and hands the batch to a
//! [`MetricsSink`].
//!
//! Recorder construction is **gracefully degraded** -- when the metrics
//! backend credentials are not configured, [`build`] logs a warning and
//! returns a [`LogRecorder`] that only logs the would-be payload, so the
//! agent still runs on a development host.

pub mod http;
pub mod logging;

use async_trait::async_trait;
use serde::Serialize;
use temp_metrics_core::measurement::Measurement;
use temp_metrics_core::metric_names::{DIMENSION_SOURCE, METRIC_HUMIDITY, METRIC_TEMPERATURE};

pub use self::http::{HttpMetricsSink, HttpSinkConfig};
pub use self::logging::LogRecorder;

const UNIT_CELSIUS: &str = "Celsius";
const UNIT_PERCENT: &str = "Percent";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for recording failures.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("Metrics request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The metrics backend returned a non-2xx status code.
    #[error("Metrics backend returned HTTP {0}")]
    HttpStatus(u16),

    /// The payload could not be encoded.
    #[error("Metrics payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// A name/value label attached to a datum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    pub name: &'static str,
    pub value: String,
}

/// One named metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDatum {
    pub metric_name: &'static str,
    pub value: f64,
    /// Unix epoch seconds.
    pub timestamp: i64,
    pub unit: &'static str,
    pub dimensions: Vec<Dimension>,
}

/// The unit of delivery to the metrics backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricBatch {
    pub namespace: String,
    pub metric_data: Vec<MetricDatum>,
}

impl MetricBatch {
    /// Build the two-datum batch for a measurement.
    pub fn from_measurement(namespace: &str, measurement: &Measurement) -> Self {
        let datum = |metric_name: &'static str, value: f64, unit: &'static str| MetricDatum {
            metric_name,
            value,
            timestamp: measurement.timestamp(),
            unit,
            dimensions: vec![Dimension {
                name: DIMENSION_SOURCE,
                value: measurement.source().to_string(),
            }],
        };

        Self {
            namespace: namespace.to_string(),
            metric_data: vec![
                datum(METRIC_TEMPERATURE, measurement.temperature(), UNIT_CELSIUS),
                datum(METRIC_HUMIDITY, measurement.humidity(), UNIT_PERCENT),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Persists or forwards one measurement.
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn record(&self, measurement: Measurement) -> Result<(), RecordingError>;

    /// Short implementation name used in log fields.
    fn name(&self) -> &'static str;
}

/// Accepts a batch of named values. Implementations own their retry policy.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_metric_data(&self, batch: &MetricBatch) -> Result<(), RecordingError>;
}

/// Recorder that publishes measurements to a [`MetricsSink`].
pub struct MetricsRecorder<S> {
    namespace: String,
    sink: S,
}

impl<S: MetricsSink> MetricsRecorder<S> {
    pub fn new(namespace: impl Into<String>, sink: S) -> Self {
        Self {
            namespace: namespace.into(),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[async_trait]
impl<S: MetricsSink> Recorder for MetricsRecorder<S> {
    async fn record(&self, measurement: Measurement) -> Result<(), RecordingError> {
        let batch = MetricBatch::from_measurement(&self.namespace, &measurement);
        self.sink.put_metric_data(&batch).await?;
        tracing::debug!(
            source = measurement.source(),
            timestamp = measurement.timestamp(),
            "Measurement recorded",
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}

/// Build the recorder for the given backend configuration.
///
/// `None` means the backend credentials are missing; a [`LogRecorder`] is
/// returned instead of failing.
pub fn build(
    namespace: &str,
    backend: Option<HttpSinkConfig>,
) -> Result<Box<dyn Recorder>, RecordingError> {
    match backend {
        Some(config) => {
            tracing::info!(endpoint = %config.endpoint, namespace, "Recording to metrics backend");
            let sink = HttpMetricsSink::new(config)?;
            Ok(Box::new(MetricsRecorder::new(namespace, sink)))
        }
        None => {
            tracing::warn!(
                namespace,
                "Metrics backend credentials not configured -- measurements will be logged, not recorded",
            );
            Ok(Box::new(LogRecorder::new(namespace)))
        }
    }
}
