//! Session types for coordination-service connections.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection endpoint of a coordination service, e.g. `zk://a:2181`.
///
/// Sessions are cached per endpoint, so two endpoints are the same session key
/// exactly when their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    /// Create an endpoint from its connect string.
    pub fn new(connect_string: impl Into<String>) -> Self {
        Self(connect_string.into())
    }

    /// Get the connect string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for one session instance.
///
/// A session closed and recreated for the same endpoint gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connectivity state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Connection constructed, no notification received yet
    Connecting,
    /// Session is connected to the service
    Connected,
    /// Connection lost, the client library is trying to recover it
    Disconnected,
    /// The service invalidated the session
    Expired,
    /// Session was explicitly closed (terminal)
    Closed,
}

impl ConnectionState {
    /// Whether no further transitions can happen.
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Expired => "expired",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Connectivity notification delivered by the client library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEvent {
    /// The connection to the service was lost
    Disconnected,
    /// The service expired the session
    Expired,
    /// The connection is (re-)established
    Connected,
}

impl ConnectionEvent {
    /// State a session is in after this notification.
    pub fn target_state(self) -> ConnectionState {
        match self {
            Self::Disconnected => ConnectionState::Disconnected,
            Self::Expired => ConnectionState::Expired,
            Self::Connected => ConnectionState::Connected,
        }
    }
}

/// Snapshot of a cached session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session instance identifier
    pub id: SessionId,
    /// Endpoint the session is connected to
    pub endpoint: Endpoint,
    /// Current connectivity state
    pub state: ConnectionState,
    /// Negotiated session timeout
    pub timeout: Duration,
    /// Creation time
    pub created_at: SystemTime,
}
