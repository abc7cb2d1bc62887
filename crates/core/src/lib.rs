//! `temp-metrics-core` -- shared domain types for the temperature metrics
//! agent.
//!
//! Holds plain data only: the [`Measurement`](measurement::Measurement)
//! produced by the measurement pipeline, the transient
//! [`RawReading`](measurement::RawReading) returned by sensors, the
//! configured [`SensorType`](sensor_type::SensorType) and the canonical
//! metric names shared with the metrics backend.

pub mod error;
pub mod measurement;
pub mod metric_names;
pub mod sensor_type;
