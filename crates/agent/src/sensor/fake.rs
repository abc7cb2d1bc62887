//! Stub sensor for hosts without the real hardware.
//!
//! Returns the current second-of-minute as temperature and
//! minute-of-hour as humidity, which is enough to see values move on a
//! dashboard while developing.

use std::sync::Arc;

use async_trait::async_trait;
use temp_metrics_core::measurement::RawReading;

use super::{Sensor, SensorError};
use crate::timer::Timer;

pub struct FakeSensor {
    timer: Arc<dyn Timer>,
}

impl FakeSensor {
    pub fn new(timer: Arc<dyn Timer>) -> Self {
        Self { timer }
    }
}

#[async_trait]
impl Sensor for FakeSensor {
    async fn read(&mut self) -> Result<RawReading, SensorError> {
        let secs = self.timer.time().floor() as i64;
        let second = secs.rem_euclid(60);
        let minute = (secs / 60).rem_euclid(60);
        Ok(RawReading::new(second as f64, minute as f64))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ScriptedTimer;

    #[tokio::test]
    async fn reading_follows_clock() {
        // 12 minutes and 34 seconds past the hour.
        let timer = Arc::new(ScriptedTimer::new([3600.0 * 5.0 + 12.0 * 60.0 + 34.7]));
        let mut sensor = FakeSensor::new(timer);
        let reading = sensor.read().await.unwrap();
        assert_eq!(reading, RawReading::new(34.0, 12.0));
    }
}
