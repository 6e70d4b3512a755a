//! Liveness watchdog for disconnected sessions.
//!
//! A monitor is started whenever a session reports `Disconnected`. It waits for
//! the session to come back, and gives up once the liveness margin has elapsed
//! since the disconnect. Giving up is logged only; callers of a stale session
//! observe it through `Session::is_connected`.

use std::time::{Duration, Instant};

use coord_session_core::{ConnectionState, Endpoint};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Deadline used when `started + margin` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

/// How a liveness monitor ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The session reconnected within the margin
    Reconnected,
    /// The margin elapsed without a reconnect
    GaveUp {
        /// Time spent waiting
        waited: Duration,
    },
    /// The monitor was superseded or its session closed
    Cancelled,
}

/// Handle to a running liveness monitor task.
#[derive(Debug)]
pub struct LivenessMonitor {
    cancel: CancellationToken,
    task: JoinHandle<MonitorOutcome>,
}

impl LivenessMonitor {
    /// Spawn a monitor on `runtime` watching `state` for a reconnect.
    ///
    /// `started` is the reference time of the disconnect; the monitor gives up
    /// at `started + margin`, or a year from now if that overflows.
    pub fn spawn(
        runtime: &Handle,
        endpoint: Endpoint,
        mut state: watch::Receiver<ConnectionState>,
        started: Instant,
        margin: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let deadline = started
            .checked_add(margin)
            .map(tokio::time::Instant::from_std)
            .unwrap_or_else(|| tokio::time::Instant::now() + FAR_FUTURE);

        let task = runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => MonitorOutcome::Cancelled,
                result = state.wait_for(|s| *s == ConnectionState::Connected) => match result {
                    Ok(_) => {
                        debug!("Liveness monitor saw reconnect: endpoint={}", endpoint);
                        MonitorOutcome::Reconnected
                    }
                    // Session dropped
                    Err(_) => MonitorOutcome::Cancelled,
                },
                _ = tokio::time::sleep_until(deadline) => {
                    let waited = started.elapsed();
                    warn!(
                        "Session still disconnected after {}ms, giving up: endpoint={}",
                        waited.as_millis(),
                        endpoint
                    );
                    MonitorOutcome::GaveUp { waited }
                }
            }
        });

        Self { cancel, task }
    }

    /// Stop the monitor. Has no effect if it already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the monitor task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the monitor to end.
    pub async fn join(&mut self) -> MonitorOutcome {
        (&mut self.task).await.unwrap_or(MonitorOutcome::Cancelled)
    }
}

impl Drop for LivenessMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_monitor(
        state: watch::Receiver<ConnectionState>,
        margin: Duration,
    ) -> LivenessMonitor {
        LivenessMonitor::spawn(
            &Handle::current(),
            Endpoint::from("zk://a:2181"),
            state,
            Instant::now(),
            margin,
        )
    }

    #[tokio::test]
    async fn test_monitor_gives_up_after_margin() {
        let (_tx, rx) = watch::channel(ConnectionState::Disconnected);
        let margin = Duration::from_millis(60);
        let started = Instant::now();

        let outcome = spawn_monitor(rx, margin).join().await;

        assert!(matches!(outcome, MonitorOutcome::GaveUp { .. }));
        assert!(started.elapsed() >= margin);
    }

    #[tokio::test]
    async fn test_monitor_ends_on_reconnect() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        let mut monitor = spawn_monitor(rx, Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send_replace(ConnectionState::Connected);

        assert_eq!(monitor.join().await, MonitorOutcome::Reconnected);
    }

    #[tokio::test]
    async fn test_monitor_cancel() {
        let (_tx, rx) = watch::channel(ConnectionState::Disconnected);
        let mut monitor = spawn_monitor(rx, Duration::from_secs(10));

        monitor.cancel();

        assert_eq!(monitor.join().await, MonitorOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_drop_cancels_monitor() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        let monitor = spawn_monitor(rx, Duration::from_secs(10));
        drop(monitor);

        // The task released its receiver once it ended.
        tokio::time::timeout(Duration::from_secs(1), tx.closed())
            .await
            .expect("monitor should stop after drop");
    }

    #[tokio::test]
    async fn test_unrepresentable_margin_keeps_monitor_running() {
        let (_tx, rx) = watch::channel(ConnectionState::Disconnected);
        let mut monitor = spawn_monitor(rx, Duration::MAX);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!monitor.is_finished());

        monitor.cancel();
        assert_eq!(monitor.join().await, MonitorOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_monitor_uses_reference_start_time() {
        let (_tx, rx) = watch::channel(ConnectionState::Disconnected);
        let started = Instant::now() - Duration::from_secs(5);

        let mut monitor = LivenessMonitor::spawn(
            &Handle::current(),
            Endpoint::from("zk://a:2181"),
            rx,
            started,
            Duration::from_secs(1),
        );

        match monitor.join().await {
            MonitorOutcome::GaveUp { waited } => assert!(waited >= Duration::from_secs(5)),
            other => panic!("expected give up, got {other:?}"),
        }
    }
}
