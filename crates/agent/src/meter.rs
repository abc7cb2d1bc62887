//! Measurement pipeline.
//!
//! [`TempMeter`] wraps a [`Sensor`] and turns its raw readings into
//! [`Measurement`]s. Invalid readings (NaN) are masked by sleeping
//! [`RetryPolicy::retry_sleep`] and reading again. By default there is no
//! upper bound on retries, so a permanently failing sensor blocks
//! `measure()` forever; set [`RetryPolicy::max_retries`] to fail instead.

use std::sync::Arc;
use std::time::Duration;

use temp_metrics_core::measurement::Measurement;

use crate::sensor::{Sensor, SensorError};
use crate::timer::Timer;

/// Default delay between re-reads of an invalid sensor value.
pub const DEFAULT_RETRY_SLEEP: Duration = Duration::from_secs(2);

/// How invalid readings are retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before each re-read.
    pub retry_sleep: Duration,
    /// Maximum number of re-reads; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_sleep: DEFAULT_RETRY_SLEEP,
            max_retries: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("Sensor returned no valid reading after {retries} retries")]
    RetriesExhausted { retries: u32 },
}

/// Produces one valid, timestamped measurement per call.
pub struct TempMeter {
    source: String,
    sensor: Box<dyn Sensor>,
    timer: Arc<dyn Timer>,
    retry: RetryPolicy,
}

impl TempMeter {
    pub fn new(
        source: impl Into<String>,
        sensor: Box<dyn Sensor>,
        timer: Arc<dyn Timer>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source: source.into(),
            sensor,
            timer,
            retry,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Read the sensor until it returns a valid value, then stamp it.
    pub async fn measure(&mut self) -> Result<Measurement, MeasureError> {
        let mut reading = self.sensor.read().await?;
        let mut retries = 0u32;

        while !reading.is_valid() {
            if self.retry.max_retries.is_some_and(|max| retries >= max) {
                tracing::error!(
                    source = %self.source,
                    sensor = self.sensor.name(),
                    retries,
                    "Giving up on invalid sensor readings",
                );
                return Err(MeasureError::RetriesExhausted { retries });
            }

            tracing::debug!(
                source = %self.source,
                sensor = self.sensor.name(),
                retry_sleep_ms = self.retry.retry_sleep.as_millis() as u64,
                "Invalid sensor reading, retrying",
            );
            self.timer.sleep(self.retry.retry_sleep).await;
            retries += 1;
            reading = self.sensor.read().await?;
        }

        let timestamp = self.timer.time().floor() as i64;
        let measurement = Measurement::from_reading(self.source.clone(), timestamp, reading);

        tracing::debug!(
            source = %self.source,
            timestamp,
            temperature = measurement.temperature(),
            humidity = measurement.humidity(),
            retries,
            "Measurement taken",
        );
        Ok(measurement)
    }
}
