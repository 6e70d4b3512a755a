//! Session manager for coordinating coordination-service sessions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use coord_session_core::{Endpoint, Error, ManagerConfig, Result, SessionInfo};

use crate::cache::SessionCache;
use crate::client::Connector;
use crate::session::Session;
use crate::signal::WaitOutcome;
use crate::watcher::{self, StateWatcher};

/// Session manager: one shared session per endpoint.
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    cache: Mutex<SessionCache>,
    config: ManagerConfig,
    shutdown: CancellationToken,
}

impl SessionManager {
    /// Create a new session manager with default configuration.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_config(connector, ManagerConfig::default())
    }

    /// Create a new session manager with custom configuration.
    pub fn with_config(connector: Arc<dyn Connector>, config: ManagerConfig) -> Self {
        Self {
            connector,
            cache: Mutex::new(SessionCache::new()),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Get or create the session for `endpoint`.
    ///
    /// A new session waits for its first `Connected` notification before it is
    /// returned. If the wait is interrupted by [`SessionManager::shutdown`] or a
    /// concurrent close, the still-connecting session is returned instead.
    /// Fails with [`Error::Connection`] once the manager has been shut down.
    pub async fn create(
        &self,
        endpoint: impl Into<Endpoint>,
        session_timeout: Duration,
    ) -> Result<Arc<Session>> {
        self.create_with_cancel(endpoint, session_timeout, self.shutdown.child_token())
            .await
    }

    /// Get or create the session for `endpoint` with the configured default timeout.
    pub async fn create_default(&self, endpoint: impl Into<Endpoint>) -> Result<Arc<Session>> {
        self.create(endpoint, self.config.session.default_timeout())
            .await
    }

    /// Like [`SessionManager::create`], but the initial wait also ends when
    /// `cancel` fires.
    ///
    /// Cancellation is not an error: the session is returned either way.
    pub async fn create_with_cancel(
        &self,
        endpoint: impl Into<Endpoint>,
        session_timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Arc<Session>> {
        let endpoint = endpoint.into();
        if endpoint.as_str().trim().is_empty() {
            return Err(Error::InvalidInput("endpoint cannot be empty".to_string()));
        }
        if session_timeout.is_zero() {
            return Err(Error::InvalidInput(format!(
                "session timeout for {endpoint} must be > 0"
            )));
        }

        // The connection is opened under the cache lock so concurrent callers
        // for a new endpoint share one connection.
        let (session, created) = {
            let mut cache = self.lock_cache();
            // Checked under the lock: `shutdown` drains the cache after cancelling.
            if self.shutdown.is_cancelled() {
                return Err(Error::connection(&endpoint, "session manager is shut down"));
            }
            cache.get_or_try_insert_with(&endpoint, || self.open(&endpoint, session_timeout))?
        };

        if !created {
            debug!("Reusing session: endpoint={}", endpoint);
            if session.signal().is_fired() {
                return Ok(session);
            }
        }

        match session.wait_connected(&cancel).await {
            WaitOutcome::Connected => {}
            WaitOutcome::Interrupted => {
                debug!(
                    "Wait for first connection interrupted: endpoint={}, state={}",
                    endpoint,
                    session.state()
                );
            }
        }

        Ok(session)
    }

    /// Construct a new session and its underlying connection.
    fn open(&self, endpoint: &Endpoint, session_timeout: Duration) -> Result<Arc<Session>> {
        let margin = self.config.session.liveness_margin(session_timeout);
        let session = Arc::new(Session::new(endpoint.clone(), session_timeout, margin));
        let watcher = StateWatcher::new(&session, Handle::current());

        let connection = self
            .connector
            .connect(endpoint, session_timeout, watcher.into_callback())
            .map_err(|e| match e {
                Error::Connection { .. } => e,
                other => Error::connection(endpoint, other.to_string()),
            })?;
        session.attach(connection);

        info!(
            "Created session: endpoint={}, id={}, timeout={}ms",
            endpoint,
            session.id(),
            session_timeout.as_millis()
        );
        Ok(session)
    }

    /// Get the session for `endpoint`, if cached.
    pub fn get(&self, endpoint: impl Into<Endpoint>) -> Option<Arc<Session>> {
        self.lock_cache().get(&endpoint.into())
    }

    /// List all cached sessions.
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> =
            self.lock_cache().iter().map(|session| session.info()).collect();
        sessions.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        sessions
    }

    /// Get the number of cached sessions.
    pub fn session_count(&self) -> usize {
        self.lock_cache().len()
    }

    /// Close the session for `endpoint`.
    ///
    /// Never fails: errors while releasing the connection are logged. Closing
    /// an unknown endpoint does nothing.
    pub fn close(&self, endpoint: impl Into<Endpoint>) {
        let endpoint = endpoint.into();
        let removed = self.lock_cache().remove(&endpoint);
        if let Some(session) = removed {
            release(&session);
        }
    }

    /// Close all sessions.
    pub fn close_all(&self) {
        let sessions = self.lock_cache().drain();
        for session in sessions {
            release(&session);
        }
    }

    /// Interrupt every pending `create` wait and close all sessions.
    ///
    /// Calls to `create` after shutdown fail without opening a connection.
    pub fn shutdown(&self) {
        info!("Shutting down session manager");
        self.shutdown.cancel();
        self.close_all();
    }

    /// Re-establish sessions scoped under `root`.
    ///
    /// Not implemented yet: always returns `true` and has no effect.
    pub fn reconnect(&self, root: &str) -> bool {
        watcher::reconnect(root)
    }

    fn lock_cache(&self) -> MutexGuard<'_, SessionCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn release(session: &Session) {
    match session.shutdown() {
        Ok(()) => debug!("Closed session: endpoint={}", session.endpoint()),
        Err(e) => warn!(
            "Failed to close session: endpoint={}, error={}",
            session.endpoint(),
            e
        ),
    }
}
