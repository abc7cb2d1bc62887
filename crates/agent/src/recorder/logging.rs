//! Degraded-mode recorder.
//!
//! Used when the metrics backend is not configured. Builds the exact
//! batch the real recorder would send and logs it, so local runs show
//! what would have been published.

use async_trait::async_trait;
use temp_metrics_core::measurement::Measurement;

use super::{MetricBatch, Recorder, RecordingError};

pub struct LogRecorder {
    namespace: String,
}

impl LogRecorder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl Recorder for LogRecorder {
    async fn record(&self, measurement: Measurement) -> Result<(), RecordingError> {
        let batch = MetricBatch::from_measurement(&self.namespace, &measurement);
        let payload = serde_json::to_string(&batch)?;
        tracing::info!(
            source = measurement.source(),
            timestamp = measurement.timestamp(),
            payload = %payload,
            "Metrics backend not configured, measurement not recorded",
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_never_fails() {
        let recorder = LogRecorder::new("TempMetrics");
        let m = Measurement::new("kitchen", 1000, 21.5, 55.0);
        assert!(recorder.record(m).await.is_ok());
        assert_eq!(recorder.name(), "log");
    }
}
