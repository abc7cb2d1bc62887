//! `temp-metrics-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod cycle;
pub mod daemon;
pub mod meter;
pub mod recorder;
pub mod sensor;
pub mod timer;
