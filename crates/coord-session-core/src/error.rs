//! Error types for coordination-service sessions.

use thiserror::Error;

use crate::Endpoint;

/// Main error type for session lifecycle operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The client library could not construct a connection
    #[error("Connection error for {endpoint}: {reason}")]
    Connection {
        /// Endpoint the connection was opened against
        endpoint: Endpoint,
        /// Failure reported by the client library
        reason: String,
    },

    /// Releasing an underlying connection failed.
    ///
    /// Only ever logged by the session manager, never returned from `close`.
    #[error("Failed to close connection to {endpoint}: {reason}")]
    Close {
        /// Endpoint whose connection was being released
        endpoint: Endpoint,
        /// Failure reported by the client library
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build a connection error for `endpoint`.
    pub fn connection(endpoint: &Endpoint, reason: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.clone(),
            reason: reason.into(),
        }
    }

    /// Build a close error for `endpoint`.
    pub fn close(endpoint: &Endpoint, reason: impl Into<String>) -> Self {
        Self::Close {
            endpoint: endpoint.clone(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error() {
        let err = Error::connection(&Endpoint::from("zk://a:2181"), "refused");
        assert_eq!(
            err.to_string(),
            "Connection error for zk://a:2181: refused"
        );
    }

    #[test]
    fn test_close_error() {
        let err = Error::close(&Endpoint::from("zk://a:2181"), "socket gone");
        assert_eq!(
            err.to_string(),
            "Failed to close connection to zk://a:2181: socket gone"
        );
    }

    #[test]
    fn test_config_error() {
        let err = Error::Config("session.default_timeout_ms must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: session.default_timeout_ms must be > 0"
        );
    }

    #[test]
    fn test_invalid_input_error() {
        let err = Error::InvalidInput("empty endpoint".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty endpoint");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
