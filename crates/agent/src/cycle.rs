//! The per-tick action: take one measurement and record it.

use anyhow::Context;
use async_trait::async_trait;

use crate::daemon::Action;
use crate::meter::TempMeter;
use crate::recorder::Recorder;

/// Bundles the measurement pipeline and the recorder it feeds.
pub struct MeasureAndRecord {
    meter: TempMeter,
    recorder: Box<dyn Recorder>,
}

impl MeasureAndRecord {
    pub fn new(meter: TempMeter, recorder: Box<dyn Recorder>) -> Self {
        Self { meter, recorder }
    }
}

#[async_trait]
impl Action for MeasureAndRecord {
    async fn run(&mut self) -> anyhow::Result<()> {
        let measurement = self
            .meter
            .measure()
            .await
            .with_context(|| format!("measuring source '{}'", self.meter.source()))?;

        tracing::info!(
            source = measurement.source(),
            timestamp = measurement.timestamp(),
            temperature = measurement.temperature(),
            humidity = measurement.humidity(),
            "Got measurement",
        );

        self.recorder
            .record(measurement)
            .await
            .context("recording measurement")?;
        Ok(())
    }
}
