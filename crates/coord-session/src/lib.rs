//! # coord-session
//!
//! Session lifecycle management for coordination-service clients.
//!
//! This crate provides:
//! - Session creation, gated on the first successful connection
//! - One shared session per endpoint
//! - Connectivity state tracking driven by client-library notifications
//! - A liveness watchdog for disconnected sessions
//! - Session cleanup on close and shutdown
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on coord-session-core and
//! talks to the coordination service only through the [`Connector`] trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod client;
pub mod manager;
pub mod monitor;
pub mod session;
pub mod signal;
pub mod testing;
pub mod watcher;

// Re-export commonly used types
pub use cache::SessionCache;
pub use client::{Connection, Connector, EventCallback};
pub use coord_session_core::{
    ConnectionEvent, ConnectionState, Endpoint, Error, ManagerConfig, Result, SessionId,
    SessionInfo,
};
pub use manager::SessionManager;
pub use monitor::{LivenessMonitor, MonitorOutcome};
pub use session::Session;
pub use signal::{ConnectionSignal, WaitOutcome};
pub use tokio_util::sync::CancellationToken;
pub use watcher::StateWatcher;
