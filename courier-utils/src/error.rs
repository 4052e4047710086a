//! Error types for courier
//!
//! Provides a unified error type used across all courier crates.

use std::path::PathBuf;
use std::time::Duration;

/// Main error type for courier operations
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Connection Errors ===

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Receive timed out after {millis}ms")]
    ReceiveTimeout { millis: u64 },

    #[error("Send queue full ({capacity} packets pending)")]
    SendQueueFull { capacity: usize },

    #[error("Dispatcher {0} is not configured")]
    DispatcherNotConfigured(u16),

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a receive timeout error from the elapsed budget
    pub fn receive_timeout(after: Duration) -> Self {
        Self::ReceiveTimeout {
            millis: after.as_millis() as u64,
        }
    }

    /// Check if this error is a transient receive timeout.
    ///
    /// Timeouts never tear a connection down; every other receive error does.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ReceiveTimeout { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

/// Result type alias using CourierError
pub type Result<T> = std::result::Result<T, CourierError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Display Tests ====================

    #[test]
    fn test_error_display_connection() {
        let err = CourierError::Connection("refused".into());
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_error_display_connection_closed() {
        let err = CourierError::ConnectionClosed;
        assert_eq!(err.to_string(), "Connection closed unexpectedly");
    }

    #[test]
    fn test_error_display_receive_timeout() {
        let err = CourierError::receive_timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Receive timed out after 1500ms");
    }

    #[test]
    fn test_error_display_send_queue_full() {
        let err = CourierError::SendQueueFull { capacity: 64 };
        assert_eq!(err.to_string(), "Send queue full (64 packets pending)");
    }

    #[test]
    fn test_error_display_dispatcher_not_configured() {
        let err = CourierError::DispatcherNotConfigured(3);
        assert_eq!(err.to_string(), "Dispatcher 3 is not configured");
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = CourierError::FileRead {
            path: PathBuf::from("/etc/courier/config.toml"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/etc/courier/config.toml"));
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = CourierError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/courier/config.toml"),
            message: "syntax error".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("config.toml"));
        assert!(msg.contains("syntax error"));
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_receive_timeout_is_timeout() {
        assert!(CourierError::ReceiveTimeout { millis: 10 }.is_timeout());
    }

    #[test]
    fn test_io_timed_out_is_timeout() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline");
        assert!(CourierError::Io(io_err).is_timeout());
    }

    #[test]
    fn test_connection_loss_is_not_timeout() {
        let not_timeouts = [
            CourierError::ConnectionClosed,
            CourierError::Connection("reset".into()),
            CourierError::Protocol("bad frame".into()),
            CourierError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset by peer",
            )),
        ];

        for err in not_timeouts {
            assert!(!err.is_timeout(), "Expected {:?} to NOT be a timeout", err);
        }
    }

    // ==================== Helper Function Tests ====================

    #[test]
    fn test_connection_helper() {
        let err = CourierError::connection("host unreachable");
        assert!(matches!(err, CourierError::Connection(_)));
        assert_eq!(err.to_string(), "Connection failed: host unreachable");
    }

    #[test]
    fn test_protocol_helper() {
        let err = CourierError::protocol("truncated header");
        assert_eq!(err.to_string(), "Protocol error: truncated header");
    }

    #[test]
    fn test_internal_helper() {
        let err = CourierError::internal("invariant violated");
        assert!(matches!(err, CourierError::Internal(_)));
    }

    #[test]
    fn test_from_io_error_preserves_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CourierError = io_err.into();
        if let CourierError::Io(inner) = err {
            assert_eq!(inner.kind(), std::io::ErrorKind::PermissionDenied);
        } else {
            panic!("Expected Io variant");
        }
    }
}
