//! `temp-metrics-agent` -- temperature/humidity metrics daemon.
//!
//! Runs on a small single-board computer, samples the configured sensor
//! at a fixed period and forwards every measurement to the metrics
//! backend. Without backend credentials the measurements are only
//! logged. Stops on SIGINT/SIGTERM.
//!
//! See [`AgentConfig::from_env`] and [`HttpSinkConfig`] for the
//! environment variables.
//!
//! [`HttpSinkConfig`]: temp_metrics_agent::recorder::HttpSinkConfig

use std::sync::Arc;

use temp_metrics_agent::config::AgentConfig;
use temp_metrics_agent::cycle::MeasureAndRecord;
use temp_metrics_agent::daemon::{Daemon, DaemonConfig};
use temp_metrics_agent::meter::TempMeter;
use temp_metrics_agent::recorder;
use temp_metrics_agent::sensor;
use temp_metrics_agent::timer::{SystemTimer, Timer};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "temp_metrics_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        let error = format!("{e:#}");
        tracing::error!(error = %error, "Agent failed to start");
        std::process::exit(1);
    }
}

/// Build the pipeline from configuration and run the daemon until it is
/// stopped. Any error here is a startup misconfiguration.
async fn run() -> anyhow::Result<()> {
    let config = AgentConfig::from_env()?;

    tracing::info!(
        source = %config.measurement.source_name,
        frequency_in_seconds = config.measurement.frequency_in_seconds,
        sensor_type = %config.measurement.sensor_type,
        "Starting temp-metrics-agent",
    );

    let daemon_config = DaemonConfig::from_secs_f64(config.measurement.frequency_in_seconds)?;
    let timer: Arc<dyn Timer> = Arc::new(SystemTimer);

    let sensor = sensor::build(
        config.measurement.sensor_type,
        config.sensor.i2c_bus,
        Arc::clone(&timer),
    )?;
    let sensor_name = sensor.name();
    let meter = TempMeter::new(
        config.measurement.source_name,
        sensor,
        Arc::clone(&timer),
        config.sensor.retry,
    );
    let recorder = recorder::build(&config.namespace, config.backend)?;
    tracing::info!(
        sensor = sensor_name,
        recorder = recorder.name(),
        "Measurement pipeline ready",
    );

    let mut daemon = Daemon::new(daemon_config, MeasureAndRecord::new(meter, recorder))
        .with_timer(timer);
    daemon.start(true).await?;

    tracing::info!("temp-metrics-agent stopped");
    Ok(())
}
