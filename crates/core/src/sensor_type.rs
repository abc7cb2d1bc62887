//! Which sensor driver the agent binds at startup.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Sensor implementations selectable through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    /// SHT31 temperature/humidity sensor on a Linux I2C bus.
    Sht31,
    /// Stub sensor for development hosts without hardware.
    Fake,
}

impl SensorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Sht31 => "sht31",
            SensorType::Fake => "fake",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sht31" => Ok(SensorType::Sht31),
            "fake" => Ok(SensorType::Fake),
            _ => Err(CoreError::UnknownSensorType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_types_case_insensitively() {
        assert_eq!("sht31".parse::<SensorType>().unwrap(), SensorType::Sht31);
        assert_eq!(" SHT31 ".parse::<SensorType>().unwrap(), SensorType::Sht31);
        assert_eq!("Fake".parse::<SensorType>().unwrap(), SensorType::Fake);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = "dht22".parse::<SensorType>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown sensor type: dht22");
    }

    #[test]
    fn display_matches_config_value() {
        for ty in [SensorType::Sht31, SensorType::Fake] {
            assert_eq!(ty.to_string().parse::<SensorType>().unwrap(), ty);
        }
    }
}
