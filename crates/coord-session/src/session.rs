//! Coordination-service session state.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use coord_session_core::{ConnectionState, Endpoint, Result, SessionId, SessionInfo};

use crate::client::Connection;
use crate::monitor::LivenessMonitor;
use crate::signal::{ConnectionSignal, WaitOutcome};

/// One logical connection to the coordination service.
///
/// Handed out as `Arc<Session>` by the session manager. Only the manager and
/// the session's state watcher change its state.
pub struct Session {
    /// Session identifier
    id: SessionId,

    /// Endpoint this session is connected to
    endpoint: Endpoint,

    /// Negotiated session timeout
    timeout: Duration,

    /// How long a disconnect may last before the liveness monitor gives up
    liveness_margin: Duration,

    /// Session creation time
    created_at: SystemTime,

    /// Fast-path view of `state == Connected`
    connected: AtomicBool,

    /// Current connectivity state
    state: watch::Sender<ConnectionState>,

    /// Released on the first `Connected` notification
    signal: ConnectionSignal,

    /// Cancelled when the session is closed
    closed: CancellationToken,

    /// Underlying client-library connection
    connection: Mutex<Option<Box<dyn Connection>>>,

    /// Active liveness monitor, if disconnected
    monitor: Mutex<Option<LivenessMonitor>>,

    /// Number of times the expiry path asked for a reconnect
    reconnect_attempts: AtomicUsize,
}

impl Session {
    pub(crate) fn new(endpoint: Endpoint, timeout: Duration, liveness_margin: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            id: SessionId::new(),
            endpoint,
            timeout,
            liveness_margin,
            created_at: SystemTime::now(),
            connected: AtomicBool::new(false),
            state,
            signal: ConnectionSignal::new(),
            closed: CancellationToken::new(),
            connection: Mutex::new(None),
            monitor: Mutex::new(None),
            reconnect_attempts: AtomicUsize::new(0),
        }
    }

    /// Get the session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Get the negotiated session timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the liveness margin.
    pub fn liveness_margin(&self) -> Duration {
        self.liveness_margin
    }

    /// Get the session creation time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Get the current connectivity state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Check whether the session is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Subscribe to connectivity state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Number of reconnects requested after expiry.
    pub fn reconnect_attempts(&self) -> usize {
        self.reconnect_attempts.load(Ordering::Acquire)
    }

    /// Whether a liveness monitor is currently running.
    pub fn monitor_active(&self) -> bool {
        self.lock_monitor()
            .as_ref()
            .is_some_and(|monitor| !monitor.is_finished())
    }

    /// Snapshot of this session.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            endpoint: self.endpoint.clone(),
            state: self.state(),
            timeout: self.timeout,
            created_at: self.created_at,
        }
    }

    /// Wait for the first successful connection.
    ///
    /// Returns [`WaitOutcome::Interrupted`] if `cancel` fires or the session is
    /// closed first.
    pub async fn wait_connected(&self, cancel: &CancellationToken) -> WaitOutcome {
        tokio::select! {
            outcome = self.signal.wait(cancel) => outcome,
            _ = self.closed.cancelled() => WaitOutcome::Interrupted,
        }
    }

    pub(crate) fn signal(&self) -> &ConnectionSignal {
        &self.signal
    }

    pub(crate) fn attach(&self, connection: Box<dyn Connection>) {
        *self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(connection);
    }

    /// Handle a `Connected` notification.
    ///
    /// Returns `true` if this notification released the connection signal.
    pub(crate) fn mark_connected(&self) -> bool {
        let mut monitor = self.lock_monitor();
        if self.transition(ConnectionState::Connected).is_none() {
            return false;
        }
        if let Some(previous) = monitor.take() {
            previous.cancel();
        }
        drop(monitor);

        self.signal.fire()
    }

    /// Handle a `Disconnected` notification, replacing any running monitor.
    pub(crate) fn mark_disconnected(&self, runtime: &Handle, started: Instant) {
        let mut monitor = self.lock_monitor();
        if self.transition(ConnectionState::Disconnected).is_none() {
            return;
        }
        if let Some(previous) = monitor.take() {
            previous.cancel();
        }
        *monitor = Some(LivenessMonitor::spawn(
            runtime,
            self.endpoint.clone(),
            self.state.subscribe(),
            started,
            self.liveness_margin,
        ));
        debug!(
            "Started liveness monitor: endpoint={}, margin={}ms",
            self.endpoint,
            self.liveness_margin.as_millis()
        );
    }

    /// Handle an `Expired` notification.
    ///
    /// Returns `false` if the session is already closed.
    pub(crate) fn mark_expired(&self) -> bool {
        let _monitor = self.lock_monitor();
        self.transition(ConnectionState::Expired).is_some()
    }

    pub(crate) fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::AcqRel);
    }

    /// Close the session and release the underlying connection.
    ///
    /// The session ends up `Closed` even if releasing the connection fails.
    /// The connection is released at most once.
    pub(crate) fn shutdown(&self) -> Result<()> {
        let mut monitor = self.lock_monitor();
        self.transition(ConnectionState::Closed);
        if let Some(previous) = monitor.take() {
            previous.cancel();
        }
        drop(monitor);
        self.closed.cancel();

        let connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        connection.map_or(Ok(()), |connection| connection.close())
    }

    /// Move to `next` unless the session is closed.
    ///
    /// Returns the previous state, or `None` if the session was already closed.
    fn transition(&self, next: ConnectionState) -> Option<ConnectionState> {
        let mut previous = None;
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            previous = Some(*state);
            *state = next;
            previous != Some(next)
        });

        if let Some(previous) = previous {
            self.connected
                .store(next == ConnectionState::Connected, Ordering::Release);
            if previous != next {
                info!(
                    "Session state changed: endpoint={}, {} → {}",
                    self.endpoint, previous, next
                );
            }
        }
        previous
    }

    fn lock_monitor(&self) -> MutexGuard<'_, Option<LivenessMonitor>> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
