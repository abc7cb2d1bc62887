//! Clock capability.
//!
//! The daemon and the measurement pipeline never touch the OS clock
//! directly; they read the time and sleep through a [`Timer`]. Production
//! code uses [`SystemTimer`]; tests inject a [`ScriptedTimer`] so nothing
//! depends on wall-clock time passing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

/// Wall-clock read and sleep.
#[async_trait]
pub trait Timer: Send + Sync {
    /// Seconds since the Unix epoch.
    fn time(&self) -> f64;

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the system time and `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimer;

#[async_trait]
impl Timer for SystemTimer {
    fn time(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic timer for tests.
///
/// `time()` pops the next scripted value; once the script is exhausted the
/// last value is repeated forever. `sleep()` records the requested
/// duration and only yields to the scheduler.
#[derive(Debug, Default)]
pub struct ScriptedTimer {
    times: Mutex<VecDeque<f64>>,
    last: Mutex<f64>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ScriptedTimer {
    pub fn new(times: impl IntoIterator<Item = f64>) -> Self {
        Self {
            times: Mutex::new(times.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Every duration passed to `sleep()` so far, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

#[async_trait]
impl Timer for ScriptedTimer {
    fn time(&self) -> f64 {
        let mut last = lock(&self.last);
        if let Some(next) = lock(&self.times).pop_front() {
            *last = next;
        }
        *last
    }

    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
        tokio::task::yield_now().await;
    }
}

/// Poisoning only happens if a test thread panicked mid-update; the data
/// is still usable for assertions.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
