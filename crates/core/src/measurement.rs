//! Sensor readings and finalized measurements.
//!
//! A [`RawReading`] is what a sensor driver hands back: a
//! temperature/humidity pair that may carry NaN when the hardware read
//! failed transiently. The measurement pipeline keeps re-reading until it
//! gets a valid one and then stamps it into an immutable [`Measurement`].

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Unvalidated temperature/humidity pair straight from a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
}

impl RawReading {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    /// Sentinel reading used by drivers to signal "try again".
    pub fn invalid() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    /// A reading is usable only when both fields are finite numbers.
    pub fn is_valid(&self) -> bool {
        self.temperature.is_finite() && self.humidity.is_finite()
    }
}

/// A validated, timestamped reading attributed to a named source.
///
/// Created once per successful pipeline cycle and moved from the
/// pipeline to the recorder. Fields are read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    source: String,
    /// Unix epoch seconds.
    timestamp: i64,
    temperature: f64,
    humidity: f64,
}

impl Measurement {
    pub fn new(source: impl Into<String>, timestamp: i64, temperature: f64, humidity: f64) -> Self {
        Self {
            source: source.into(),
            timestamp,
            temperature,
            humidity,
        }
    }

    /// Stamp a validated reading with its source and timestamp.
    pub fn from_reading(source: impl Into<String>, timestamp: i64, reading: RawReading) -> Self {
        Self::new(source, timestamp, reading.temperature, reading.humidity)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    /// The timestamp as a UTC date-time, or `None` if it is out of
    /// chrono's representable range.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_with_nan_is_invalid() {
        assert!(!RawReading::new(f64::NAN, 40.0).is_valid());
        assert!(!RawReading::new(21.0, f64::NAN).is_valid());
        assert!(!RawReading::invalid().is_valid());
    }

    #[test]
    fn reading_with_infinity_is_invalid() {
        assert!(!RawReading::new(f64::INFINITY, 40.0).is_valid());
        assert!(!RawReading::new(21.0, f64::NEG_INFINITY).is_valid());
    }

    #[test]
    fn finite_reading_is_valid() {
        assert!(RawReading::new(21.5, 55.0).is_valid());
        assert!(RawReading::new(-10.0, 0.0).is_valid());
    }

    #[test]
    fn measurement_from_reading_keeps_values() {
        let m = Measurement::from_reading("kitchen", 1000, RawReading::new(21.5, 55.0));
        assert_eq!(m.source(), "kitchen");
        assert_eq!(m.timestamp(), 1000);
        assert_eq!(m.temperature(), 21.5);
        assert_eq!(m.humidity(), 55.0);
    }

    #[test]
    fn recorded_at_converts_epoch_seconds() {
        let m = Measurement::new("kitchen", 1_600_000_000, 20.0, 50.0);
        let at = m.recorded_at().expect("timestamp in range");
        assert_eq!(at.to_rfc3339(), "2020-09-13T12:26:40+00:00");
    }

    #[test]
    fn measurement_serializes_all_fields() {
        let m = Measurement::new("kitchen", 1000, 21.5, 55.0);
        let parsed = serde_json::to_value(&m).expect("serialization should succeed");
        assert_eq!(parsed["source"], "kitchen");
        assert_eq!(parsed["timestamp"], 1000);
        assert_eq!(parsed["temperature"], 21.5);
        assert_eq!(parsed["humidity"], 55.0);
    }
}
