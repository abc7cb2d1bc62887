//! SHT31 temperature/humidity sensor over Linux i2c-dev.
//!
//! One reading is a single-shot, high-repeatability measurement: send
//! `0x2C 0x06`, wait for the conversion, then read six bytes
//! (temperature MSB/LSB/CRC, humidity MSB/LSB/CRC).
//!
//! A CRC mismatch is treated as a transient failure and reported as an
//! invalid (NaN) reading so the pipeline retries. Bus I/O errors are
//! returned as [`SensorError::Device`].
//!
//! i2c-dev transfers are blocking syscalls, so both bus transfers run on
//! the blocking thread pool.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use temp_metrics_core::measurement::RawReading;

use super::{Sensor, SensorError};

/// Default SHT31 address (ADDR pin low).
const SENSOR_ADDRESS: u16 = 0x44;

/// Single-shot measurement, clock stretching enabled, high repeatability.
const MEASURE_CMD: [u8; 2] = [0x2C, 0x06];

/// Time the sensor needs to complete a high-repeatability conversion.
const CMD_EXEC_TIME: Duration = Duration::from_millis(16);

/// `I2C_SLAVE` request from `<linux/i2c-dev.h>`.
const I2C_SLAVE: u32 = 0x0703;

const CRC_POLYNOMIAL: u8 = 0x31;
const CRC_INIT: u8 = 0xFF;

pub struct Sht31Sensor {
    path: String,
    file: Arc<File>,
}

impl Sht31Sensor {
    /// Device node for the given bus number, e.g. `/dev/i2c-1`.
    pub fn device_path(bus: u8) -> String {
        format!("/dev/i2c-{bus}")
    }

    /// Open the bus device and select the sensor address.
    pub fn open(bus: u8) -> Result<Self, SensorError> {
        let path = Self::device_path(bus);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| SensorError::Device {
                path: path.clone(),
                source,
            })?;

        // SAFETY: `file` is an open descriptor for the lifetime of the call
        // and I2C_SLAVE takes the target address by value.
        let rc = unsafe {
            libc::ioctl(
                file.as_raw_fd(),
                I2C_SLAVE as _,
                libc::c_ulong::from(SENSOR_ADDRESS),
            )
        };
        if rc < 0 {
            return Err(SensorError::Device {
                path,
                source: std::io::Error::last_os_error(),
            });
        }

        tracing::info!(device = %path, address = SENSOR_ADDRESS, "Using SHT31 sensor");
        Ok(Self {
            path,
            file: Arc::new(file),
        })
    }

    fn device_error(&self, source: std::io::Error) -> SensorError {
        SensorError::Device {
            path: self.path.clone(),
            source,
        }
    }

    /// Run one blocking transfer on the bus device off the async workers.
    async fn transfer<T, F>(&self, op: F) -> Result<T, SensorError>
    where
        T: Send + 'static,
        F: FnOnce(&File) -> std::io::Result<T> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || op(&file))
            .await
            .map_err(std::io::Error::other)
            .and_then(|result| result)
            .map_err(|e| self.device_error(e))
    }
}

#[async_trait]
impl Sensor for Sht31Sensor {
    async fn read(&mut self) -> Result<RawReading, SensorError> {
        self.transfer(|mut file| file.write_all(&MEASURE_CMD))
            .await?;

        tokio::time::sleep(CMD_EXEC_TIME).await;

        let frame = self
            .transfer(|mut file| {
                let mut frame = [0u8; 6];
                file.read_exact(&mut frame)?;
                Ok(frame)
            })
            .await?;

        Ok(decode_frame(&frame).unwrap_or_else(|| {
            tracing::warn!(device = %self.path, "SHT31 CRC check failed, discarding reading");
            RawReading::invalid()
        }))
    }

    fn name(&self) -> &'static str {
        "sht31"
    }
}

/// CRC-8 as specified by the SHT3x datasheet.
fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC_INIT;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Decode a 6-byte measurement frame, or `None` if either CRC fails.
fn decode_frame(frame: &[u8; 6]) -> Option<RawReading> {
    let [t_msb, t_lsb, t_crc, h_msb, h_lsb, h_crc] = *frame;
    if crc8(&[t_msb, t_lsb]) != t_crc || crc8(&[h_msb, h_lsb]) != h_crc {
        return None;
    }

    let raw_temp = f64::from(u16::from_be_bytes([t_msb, t_lsb]));
    let raw_humidity = f64::from(u16::from_be_bytes([h_msb, h_lsb]));

    Some(RawReading::new(
        -45.0 + 175.0 * raw_temp / 65535.0,
        100.0 * raw_humidity / 65535.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_datasheet_example() {
        // 0xBEEF -> 0x92 per the SHT3x datasheet.
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn decodes_valid_frame() {
        let frame = [0x66, 0x66, crc8(&[0x66, 0x66]), 0x80, 0x00, crc8(&[0x80, 0x00])];
        let reading = decode_frame(&frame).expect("valid frame");
        // 0x6666 / 0xFFFF = 0.4
        assert!((reading.temperature - 25.0).abs() < 1e-9);
        assert!((reading.humidity - 50.000_762_951).abs() < 1e-6);
    }

    #[test]
    fn decodes_range_extremes() {
        let zero = [0x00, 0x00, crc8(&[0x00, 0x00]), 0x00, 0x00, crc8(&[0x00, 0x00])];
        let reading = decode_frame(&zero).unwrap();
        assert_eq!(reading, RawReading::new(-45.0, 0.0));

        let full = [0xFF, 0xFF, crc8(&[0xFF, 0xFF]), 0xFF, 0xFF, crc8(&[0xFF, 0xFF])];
        let reading = decode_frame(&full).unwrap();
        assert_eq!(reading, RawReading::new(130.0, 100.0));
    }

    #[test]
    fn rejects_corrupted_temperature_crc() {
        let frame = [0x66, 0x66, crc8(&[0x66, 0x66]) ^ 0x01, 0x80, 0x00, crc8(&[0x80, 0x00])];
        assert!(decode_frame(&frame).is_none());
    }

    #[test]
    fn rejects_corrupted_humidity_crc() {
        let frame = [0x66, 0x66, crc8(&[0x66, 0x66]), 0x80, 0x00, crc8(&[0x80, 0x00]) ^ 0xFF];
        assert!(decode_frame(&frame).is_none());
    }

    #[test]
    fn device_path_uses_bus_number() {
        assert_eq!(Sht31Sensor::device_path(1), "/dev/i2c-1");
    }

    /// Sensor bound to `/dev/null`: writes succeed, reads hit EOF.
    fn null_bus_sensor() -> Sht31Sensor {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/null")
            .unwrap();
        Sht31Sensor {
            path: "/dev/null".into(),
            file: Arc::new(file),
        }
    }

    #[tokio::test]
    async fn short_bus_read_is_device_error() {
        let mut sensor = null_bus_sensor();

        let err = sensor.read().await.unwrap_err();

        let SensorError::Device { path, source } = err;
        assert_eq!(path, "/dev/null");
        assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn bus_transfer_runs_off_the_runtime_thread() {
        let sensor = null_bus_sensor();
        let runtime_thread = std::thread::current().id();

        let transfer_thread = sensor
            .transfer(|_| Ok(std::thread::current().id()))
            .await
            .unwrap();

        assert_ne!(transfer_thread, runtime_thread);
    }

    #[test]
    fn open_missing_device_fails() {
        let err = Sht31Sensor::open(250).err().expect("no such bus");
        assert!(err.to_string().starts_with("I2C device /dev/i2c-250 failed"));
    }
}
