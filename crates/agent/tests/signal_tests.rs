//! SIGINT handling. Lives in its own test binary so the raised signal
//! cannot reach daemons started by other tests.

#![cfg(unix)]

use std::time::Duration;

use temp_metrics_agent::daemon::{Daemon, DaemonConfig};

#[tokio::test]
async fn sigint_stops_running_daemon() {
    let mut daemon = Daemon::new(
        DaemonConfig::from_secs_f64(10.0).unwrap(),
        || -> anyhow::Result<()> { Ok(()) },
    );

    daemon.start(false).await.unwrap();
    assert!(daemon.running());

    // SAFETY: raise() only delivers a signal to this process; tokio's
    // handler for SIGINT was installed by start().
    let rc = unsafe { libc::raise(libc::SIGINT) };
    assert_eq!(rc, 0);

    assert!(daemon.wait_for_completion(Duration::from_millis(500)).await);
    assert!(!daemon.running());
    assert!(daemon.shutdown_token().is_cancelled());
}
