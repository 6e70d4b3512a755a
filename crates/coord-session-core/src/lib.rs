//! # coord-session-core
//!
//! Core types for coordination-service sessions.
//!
//! This crate contains the fundamental types with **no internal dependencies**
//! on other coord-session crates. It provides:
//!
//! - Session types (Endpoint, SessionId, ConnectionState, ConnectionEvent, SessionInfo)
//! - Configuration types
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - the session lifecycle crate depends on
//! this one, but this crate has no dependencies on other coord-session crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use config::{ManagerConfig, SessionSettings};
pub use error::{Error, Result};
pub use session::{ConnectionEvent, ConnectionState, Endpoint, SessionId, SessionInfo};
