//! Boundary with the coordination-service client library.
//!
//! The session manager never speaks the wire protocol itself. It asks a
//! [`Connector`] to open a [`Connection`] and hands it a callback through which
//! the library reports connectivity changes.

use std::sync::Arc;
use std::time::Duration;

use coord_session_core::{ConnectionEvent, Endpoint, Result};

/// Callback the client library invokes for every connectivity notification.
///
/// Notifications for one connection are delivered one at a time, in order,
/// from the library's own dispatch thread.
pub type EventCallback = Arc<dyn Fn(ConnectionEvent) + Send + Sync>;

/// An open connection owned by the client library.
pub trait Connection: Send + Sync {
    /// Release the connection.
    fn close(&self) -> Result<()>;
}

/// Constructor for client-library connections.
pub trait Connector: Send + Sync {
    /// Open a connection to `endpoint` with the given session timeout.
    ///
    /// Must return without waiting for the connection to be established;
    /// establishment is reported later through `on_event`.
    fn connect(
        &self,
        endpoint: &Endpoint,
        session_timeout: Duration,
        on_event: EventCallback,
    ) -> Result<Box<dyn Connection>>;
}
