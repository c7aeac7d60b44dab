//! Unified error hierarchy for TrackRS
//!
//! Sensor noise is not an error anywhere in this crate; it is filtered and
//! logged. The types here cover caller bugs (state machine misuse), storage
//! and replay failures, and configuration problems.

use crate::models::SessionState;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all TrackRS operations
#[derive(Debug, Error)]
pub enum TrackRsError {
    /// Session state machine misuse
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Run history storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Replay input errors
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Ordering violations in the session lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Operation called from a state that does not allow it
    #[error("cannot {operation} while session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionState,
    },
}

/// Run history storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage directory could not be created or read
    #[error("Storage directory unavailable: {path}")]
    DirectoryUnavailable { path: PathBuf },

    /// No stored run with this key
    #[error("Run not found: {key}")]
    NotFound { key: String },

    /// A stored file is not a readable session record
    #[error("Corrupted record {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reading sensor replay inputs
#[derive(Debug, Error)]
pub enum ReplayError {
    /// File extension not recognized
    #[error("Unsupported replay format: {format}")]
    UnsupportedFormat { format: String },

    /// A row or track point could not be parsed
    #[error("Parse error in {format} at {location}: {reason}")]
    Parse {
        format: &'static str,
        location: String,
        reason: String,
    },

    /// The input contained no usable sensor events
    #[error("No sensor events in {path}")]
    Empty { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for TrackRS operations
pub type Result<T> = std::result::Result<T, TrackRsError>;

impl TrackRsError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TrackRsError::Io(_) | TrackRsError::Storage(StorageError::Io(_))
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrackRsError::Session(_) => ErrorSeverity::Critical,
            TrackRsError::Storage(StorageError::NotFound { .. }) => ErrorSeverity::Warning,
            TrackRsError::Storage(StorageError::Corrupted { .. }) => ErrorSeverity::Warning,
            TrackRsError::Replay(ReplayError::Parse { .. }) => ErrorSeverity::Warning,
            TrackRsError::Validation(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TrackRsError::Storage(StorageError::NotFound { key }) => {
                format!("No saved run named {}", key)
            }
            TrackRsError::Replay(ReplayError::UnsupportedFormat { format }) => {
                format!(
                    "Cannot replay '{}' files. Use a CSV event log or a GPX track.",
                    format
                )
            }
            TrackRsError::Replay(ReplayError::Empty { path }) => {
                format!("{} contains no sensor data to replay", path.display())
            }
            TrackRsError::Configuration(reason) => {
                format!("Configuration problem: {}. Check your config file.", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Caller bug; the integration must be fixed
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = TrackRsError::Session(SessionError::InvalidTransition {
            operation: "stop",
            state: SessionState::Idle,
        });
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);

        let err = TrackRsError::Storage(StorageError::NotFound {
            key: "run.1".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_error_retryable() {
        let err = TrackRsError::Io(std::io::Error::new(std::io::ErrorKind::Other, "busy"));
        assert!(err.is_retryable());

        let err = TrackRsError::Validation("test".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transition_message() {
        let err = SessionError::InvalidTransition {
            operation: "stop",
            state: SessionState::Idle,
        };
        assert_eq!(err.to_string(), "cannot stop while session is Idle");
    }

    #[test]
    fn test_user_messages() {
        let err = TrackRsError::Replay(ReplayError::UnsupportedFormat {
            format: "fit".to_string(),
        });
        assert!(err.user_message().contains("GPX"));
    }
}
