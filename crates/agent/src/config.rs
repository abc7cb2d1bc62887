//! Agent configuration loaded from environment variables.
//!
//! Unlike the metrics backend credentials (whose absence only degrades
//! the recorder), every value here must be valid: a bad value is a
//! misconfiguration that retrying cannot fix, so loading fails fast.

use std::time::Duration;

use temp_metrics_core::error::CoreError;
use temp_metrics_core::metric_names::DEFAULT_NAMESPACE;
use temp_metrics_core::sensor_type::SensorType;

use crate::meter::{RetryPolicy, DEFAULT_RETRY_SLEEP};
use crate::recorder::HttpSinkConfig;

/// Default seconds between measurements.
const DEFAULT_FREQUENCY_SECS: f64 = 60.0;

/// Default I2C bus (`/dev/i2c-1` on a Raspberry Pi).
const DEFAULT_I2C_BUS: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// What to measure and how often.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementConfig {
    pub source_name: String,
    pub frequency_in_seconds: f64,
    pub sensor_type: SensorType,
}

/// Hardware and retry settings for the sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub i2c_bus: u8,
    pub retry: RetryPolicy,
}

/// Full agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub measurement: MeasurementConfig,
    pub sensor: SensorConfig,
    pub namespace: String,
    /// `None` when the backend credentials are not configured.
    pub backend: Option<HttpSinkConfig>,
}

impl AgentConfig {
    /// Load configuration from the process environment.
    ///
    /// | Variable                           | Required | Default     |
    /// |------------------------------------|----------|-------------|
    /// | `MEASUREMENT_SOURCE_NAME`          | yes      | --          |
    /// | `MEASUREMENT_FREQUENCY_IN_SECONDS` | no       | `60`        |
    /// | `MEASUREMENT_SENSOR_TYPE`          | no       | `sht31`     |
    /// | `SENSOR_I2C_BUS`                   | no       | `1`         |
    /// | `SENSOR_RETRY_SLEEP_SECS`          | no       | `2`         |
    /// | `SENSOR_MAX_RETRIES`               | no       | unbounded   |
    /// | `METRICS_NAMESPACE`                | no       | `TempMetrics` |
    ///
    /// Backend credentials are read by [`HttpSinkConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let source_name = get("MEASUREMENT_SOURCE_NAME")
            .map(|v| v.trim().to_string())
            .ok_or(ConfigError::Missing("MEASUREMENT_SOURCE_NAME"))?;

        let frequency_in_seconds = match get("MEASUREMENT_FREQUENCY_IN_SECONDS") {
            Some(raw) => parse_positive_secs("MEASUREMENT_FREQUENCY_IN_SECONDS", &raw)?,
            None => DEFAULT_FREQUENCY_SECS,
        };

        let sensor_type = match get("MEASUREMENT_SENSOR_TYPE") {
            Some(raw) => raw.parse::<SensorType>()?,
            None => SensorType::Sht31,
        };

        let i2c_bus = match get("SENSOR_I2C_BUS") {
            Some(raw) => parse_number("SENSOR_I2C_BUS", &raw)?,
            None => DEFAULT_I2C_BUS,
        };

        let retry_sleep = match get("SENSOR_RETRY_SLEEP_SECS") {
            Some(raw) => parse_duration("SENSOR_RETRY_SLEEP_SECS", &raw)?,
            None => DEFAULT_RETRY_SLEEP,
        };

        let max_retries = get("SENSOR_MAX_RETRIES")
            .map(|raw| parse_number("SENSOR_MAX_RETRIES", &raw))
            .transpose()?;

        Ok(Self {
            measurement: MeasurementConfig {
                source_name,
                frequency_in_seconds,
                sensor_type,
            },
            sensor: SensorConfig {
                i2c_bus,
                retry: RetryPolicy {
                    retry_sleep,
                    max_retries,
                },
            },
            namespace: get("METRICS_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            backend: HttpSinkConfig::from_lookup(&lookup),
        })
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_positive_secs(var: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let secs: f64 = parse_number(var, raw)?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "must be a positive number of seconds".to_string(),
        });
    }
    Ok(secs)
}

fn parse_duration(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = parse_positive_secs(var, raw)?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
