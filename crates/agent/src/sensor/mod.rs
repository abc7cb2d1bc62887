//! Sensor capability.
//!
//! A [`Sensor`] returns one [`RawReading`] per call. A reading containing
//! NaN means "transient failure, try again"; retrying is the measurement
//! pipeline's job, so implementations must return promptly instead of
//! looping on their own.
//!
//! [`build`] selects the implementation from configuration. When the
//! SHT31 bus device is missing (e.g. a developer laptop) the agent falls
//! back to [`FakeSensor`] with a warning instead of refusing to start.

pub mod fake;
pub mod sht31;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use temp_metrics_core::measurement::RawReading;
use temp_metrics_core::sensor_type::SensorType;

use crate::timer::Timer;

pub use fake::FakeSensor;
pub use sht31::Sht31Sensor;

/// Error type for unrecoverable sensor failures.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// Opening or talking to the bus device failed.
    #[error("I2C device {path} failed: {source}")]
    Device {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Opaque source of raw temperature/humidity readings.
#[async_trait]
pub trait Sensor: Send {
    /// Take a single reading.
    async fn read(&mut self) -> Result<RawReading, SensorError>;

    /// Short driver name used in log fields.
    fn name(&self) -> &'static str;
}

/// Bind the sensor implementation selected by `sensor_type`.
pub fn build(
    sensor_type: SensorType,
    i2c_bus: u8,
    timer: Arc<dyn Timer>,
) -> Result<Box<dyn Sensor>, SensorError> {
    match sensor_type {
        SensorType::Fake => Ok(Box::new(FakeSensor::new(timer))),
        SensorType::Sht31 => {
            let path = Sht31Sensor::device_path(i2c_bus);
            if !Path::new(&path).exists() {
                tracing::warn!(
                    device = %path,
                    "I2C device not found -- fake measurements will be returned for the SHT31 sensor",
                );
                return Ok(Box::new(FakeSensor::new(timer)));
            }
            Ok(Box::new(Sht31Sensor::open(i2c_bus)?))
        }
    }
}
