//! Fixed-period scheduling daemon.
//!
//! [`Daemon`] runs an [`Action`] every `period` on a dedicated tokio task.
//! The loop polls the [`Timer`] every [`POLL_INTERVAL`] and fires the
//! action once more than `period` has elapsed since the previous tick, so
//! the first tick fires immediately and later ticks fire at most once per
//! period.
//!
//! Each tick runs inside a failure boundary: an error *or* a panic from
//! the action is logged and the loop carries on. Ticks never overlap;
//! the next one is not considered before the current action returns.
//!
//! Lifecycle is `Idle -> Running -> Stopped`. Cancellation is cooperative
//! through a [`CancellationToken`] owned by the daemon and observed at the
//! top of every loop iteration. SIGINT/SIGTERM cancel the same token.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::timer::{SystemTimer, Timer};

/// How often the loop checks whether a tick is due.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("Daemon period must be a positive number of seconds, got {0}")]
    InvalidPeriod(f64),

    #[error("Daemon is already running")]
    AlreadyRunning,

    #[error("Daemon has already stopped and cannot be restarted")]
    AlreadyStopped,
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Work performed on every tick.
#[async_trait]
pub trait Action: Send + 'static {
    async fn run(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> Action for F
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    async fn run(&mut self) -> anyhow::Result<()> {
        self()
    }
}

// ---------------------------------------------------------------------------
// DaemonConfig
// ---------------------------------------------------------------------------

/// Scheduling parameters, immutable once the daemon is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaemonConfig {
    period: Duration,
}

impl DaemonConfig {
    pub fn new(period: Duration) -> Result<Self, DaemonError> {
        if period.is_zero() {
            return Err(DaemonError::InvalidPeriod(0.0));
        }
        Ok(Self { period })
    }

    /// Build from a period in (fractional) seconds.
    pub fn from_secs_f64(secs: f64) -> Result<Self, DaemonError> {
        let period = Duration::try_from_secs_f64(secs).map_err(|_| DaemonError::InvalidPeriod(secs))?;
        if period.is_zero() {
            return Err(DaemonError::InvalidPeriod(secs));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

enum State<A> {
    /// Not started yet; owns the action until the worker takes it.
    Idle(A),
    Running(JoinHandle<()>),
    /// Worker exited and has been joined.
    Stopped,
}

pub struct Daemon<A> {
    config: DaemonConfig,
    timer: Arc<dyn Timer>,
    shutdown: CancellationToken,
    handle_signals: bool,
    state: State<A>,
}

impl<A: Action> Daemon<A> {
    pub fn new(config: DaemonConfig, action: A) -> Self {
        Self {
            config,
            timer: Arc::new(SystemTimer),
            shutdown: CancellationToken::new(),
            handle_signals: true,
            state: State::Idle(action),
        }
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    /// Use an externally created token, e.g. one shared with the action.
    pub fn with_shutdown_token(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Do not install the SIGINT/SIGTERM handler on start.
    pub fn without_signal_handler(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    /// Token that stops the daemon when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn config(&self) -> DaemonConfig {
        self.config
    }

    /// Launch the tick loop.
    ///
    /// With `blocking` set, the returned future only completes after the
    /// loop has exited (i.e. after [`stop`](Self::stop) or a signal).
    /// Fails without spawning anything if the daemon is running or has
    /// already stopped.
    pub async fn start(&mut self, blocking: bool) -> Result<(), DaemonError> {
        let action = match std::mem::replace(&mut self.state, State::Stopped) {
            State::Idle(action) if !self.shutdown.is_cancelled() => action,
            State::Idle(action) => {
                self.state = State::Idle(action);
                return Err(DaemonError::AlreadyStopped);
            }
            State::Running(handle) => {
                let finished = handle.is_finished();
                self.state = State::Running(handle);
                return Err(if finished {
                    DaemonError::AlreadyStopped
                } else {
                    DaemonError::AlreadyRunning
                });
            }
            State::Stopped => return Err(DaemonError::AlreadyStopped),
        };

        if self.handle_signals {
            spawn_signal_watcher(self.shutdown.clone());
        }

        tracing::info!(
            period_secs = self.config.period.as_secs_f64(),
            blocking,
            "Starting daemon",
        );
        let handle = tokio::spawn(run_loop(
            action,
            self.config.period,
            Arc::clone(&self.timer),
            self.shutdown.clone(),
        ));
        self.state = State::Running(handle);

        if blocking {
            self.join().await;
        }
        Ok(())
    }

    /// Ask the loop to exit after the current iteration. No-op unless
    /// the daemon is running.
    pub fn stop(&self) {
        if matches!(self.state, State::Running(_)) && !self.shutdown.is_cancelled() {
            tracing::info!("Stopping daemon");
            self.shutdown.cancel();
        }
    }

    /// Whether the worker task is alive.
    pub fn running(&self) -> bool {
        match &self.state {
            State::Running(handle) => !handle.is_finished(),
            State::Idle(_) | State::Stopped => false,
        }
    }

    /// Wait up to `timeout` for the worker to exit. Does not request a stop.
    ///
    /// Returns `true` if no worker is running anymore.
    pub async fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        let State::Running(handle) = &mut self.state else {
            return true;
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(joined) => {
                log_join_result(joined);
                self.state = State::Stopped;
                true
            }
            Err(_elapsed) => false,
        }
    }

    async fn join(&mut self) {
        if let State::Running(handle) = &mut self.state {
            log_join_result(handle.await);
            self.state = State::Stopped;
        }
    }
}

impl<A> Drop for Daemon<A> {
    fn drop(&mut self) {
        if matches!(self.state, State::Running(_)) {
            self.shutdown.cancel();
        }
    }
}

fn log_join_result(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Daemon worker terminated abnormally");
    }
}

/// The tick loop. Runs until `shutdown` is cancelled.
async fn run_loop<A: Action>(
    mut action: A,
    period: Duration,
    timer: Arc<dyn Timer>,
    shutdown: CancellationToken,
) {
    let period_secs = period.as_secs_f64();
    let mut last_exec_time = 0.0_f64;
    let mut ticks = 0u64;

    while !shutdown.is_cancelled() {
        let current_time = timer.time();
        if current_time - last_exec_time > period_secs {
            ticks += 1;
            match AssertUnwindSafe(action.run()).catch_unwind().await {
                Ok(Ok(())) => tracing::debug!(tick = ticks, "Daemon action completed"),
                Ok(Err(e)) => {
                    let error = format!("{e:#}");
                    tracing::error!(tick = ticks, error = %error, "Daemon action failed");
                }
                Err(panic) => {
                    tracing::error!(
                        tick = ticks,
                        panic = panic_message(panic.as_ref()),
                        "Daemon action panicked",
                    );
                }
            }
            last_exec_time = current_time;
        }
        timer.sleep(POLL_INTERVAL).await;
    }

    tracing::info!(ticks, "Daemon loop stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
///
/// The handlers are registered before this returns, so a signal raised
/// right after `start()` is already observed. The watcher exits once the
/// daemon stops.
fn spawn_signal_watcher(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut interrupt, mut terminate) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(interrupt), Ok(terminate)) => (interrupt, terminate),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(error = %e, "Failed to install signal handlers");
                    return;
                }
            };

        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt.recv() => {
                    tracing::info!("Received SIGINT, stopping daemon");
                    shutdown.cancel();
                }
                _ = terminate.recv() => {
                    tracing::info!("Received SIGTERM, stopping daemon");
                    shutdown.cancel();
                }
                _ = shutdown.cancelled() => {}
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                        return;
                    }
                    tracing::info!("Received Ctrl-C, stopping daemon");
                    shutdown.cancel();
                }
                _ = shutdown.cancelled() => {}
            }
        });
    }
}
