//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use temp_metrics_agent::recorder::{MetricBatch, MetricsSink, Recorder, RecordingError};
use temp_metrics_agent::sensor::{Sensor, SensorError};
use temp_metrics_core::measurement::{Measurement, RawReading};
use tokio_util::sync::CancellationToken;

/// Sensor that replays a fixed script of readings, repeating the last
/// one once the script runs out. `Err` entries become device errors.
pub struct ScriptedSensor {
    script: VecDeque<Result<RawReading, String>>,
    last: RawReading,
    reads: Arc<Mutex<usize>>,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Result<RawReading, String>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: RawReading::invalid(),
            reads: Arc::new(Mutex::new(0)),
        }
    }

    pub fn readings(readings: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::new(readings.into_iter().map(|(t, h)| Ok(RawReading::new(t, h))))
    }

    /// Shared counter of `read()` calls.
    pub fn read_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.reads)
    }
}

#[async_trait]
impl Sensor for ScriptedSensor {
    async fn read(&mut self) -> Result<RawReading, SensorError> {
        *self.reads.lock().unwrap() += 1;
        match self.script.pop_front() {
            Some(Ok(reading)) => {
                self.last = reading;
                Ok(reading)
            }
            Some(Err(msg)) => Err(SensorError::Device {
                path: "/dev/i2c-test".into(),
                source: std::io::Error::other(msg),
            }),
            None => Ok(self.last),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Sink that keeps every batch it is given, or fails with the configured
/// HTTP status.
#[derive(Default)]
pub struct CapturingSink {
    batches: Mutex<Vec<MetricBatch>>,
    fail_with: Option<u16>,
}

impl CapturingSink {
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<MetricBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSink for CapturingSink {
    async fn put_metric_data(&self, batch: &MetricBatch) -> Result<(), RecordingError> {
        if let Some(status) = self.fail_with {
            return Err(RecordingError::HttpStatus(status));
        }
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

/// Recorder that stores measurements and optionally cancels a token after
/// a given number of records.
#[derive(Clone, Default)]
pub struct CapturingRecorder {
    records: Arc<Mutex<Vec<Measurement>>>,
    stop_after: Option<(usize, CancellationToken)>,
    fail_with: Option<u16>,
}

impl CapturingRecorder {
    pub fn stopping_after(count: usize, token: CancellationToken) -> Self {
        Self {
            stop_after: Some((count, token)),
            ..Default::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<Measurement> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recorder for CapturingRecorder {
    async fn record(&self, measurement: Measurement) -> Result<(), RecordingError> {
        if let Some(status) = self.fail_with {
            return Err(RecordingError::HttpStatus(status));
        }
        let count = {
            let mut records = self.records.lock().unwrap();
            records.push(measurement);
            records.len()
        };
        if let Some((limit, token)) = &self.stop_after {
            if count >= *limit {
                token.cancel();
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "capturing"
    }
}
