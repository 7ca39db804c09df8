//! Error types for the terradrift reconciliation engine.
//!
//! This module provides the error hierarchy for all operations in the
//! reconciliation lifecycle: snapshot parsing, output handling, change
//! locking, external tool execution, and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for terradrift operations.
#[derive(Debug, Error)]
pub enum TerradriftError {
    /// State snapshot parsing errors.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Output document errors.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Change lock errors.
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    /// External tool execution errors.
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while parsing a full state snapshot document.
///
/// A structurally invalid document is fatal to that parse call and never
/// yields a partial resource map.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The document is not valid JSON at all.
    #[error("State document is not valid JSON: {message}")]
    Malformed {
        /// Description of the JSON error.
        message: String,
    },

    /// The document is JSON but not a valid state snapshot.
    #[error("Not a valid state document: {message}")]
    Invalid {
        /// What structural prerequisite was violated.
        message: String,
    },

    /// A required node in the nested resource path is missing.
    #[error("State document is missing the '{path}' node")]
    MissingNode {
        /// Dotted path to the missing node.
        path: String,
    },

    /// A resource entry is missing a required field.
    #[error("Resource entry is missing the '{field}' field")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },
}

/// Errors raised while handling an output document.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The output document is present but not valid JSON.
    #[error("Output document does not have the expected format: {message}")]
    InvalidFormat {
        /// Description of the parse failure.
        message: String,
    },
}

/// Errors raised by the change lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Exclusive access was not obtained within the timeout.
    #[error(
        "Cannot perform '{label}': timed out waiting for the change lock held by {holder} \
         (is another change or refresh in progress?)"
    )]
    Timeout {
        /// Label of the operation that requested the lock.
        label: String,
        /// Description of the blocking owner.
        holder: String,
    },
}

/// Errors raised by the external execution collaborator.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The underlying tool invocation failed.
    #[error("Failed to run '{operation}': {message}")]
    CommandFailed {
        /// The operation that was attempted.
        operation: String,
        /// Failure detail from the execution layer.
        message: String,
    },

    /// The execution collaborator is not reachable.
    #[error("Execution backend unavailable: {message}")]
    Unavailable {
        /// Description of the transport failure.
        message: String,
    },
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Result type alias for terradrift operations.
pub type Result<T> = std::result::Result<T, TerradriftError>;

impl TerradriftError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable by the caller.
    ///
    /// A lock timeout means another change was in progress; the operation
    /// itself never started and may simply be attempted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Lock(LockError::Timeout { .. }) | Self::Exec(ExecError::Unavailable { .. })
        )
    }
}

impl SnapshotError {
    /// Creates an `Invalid` error with the given message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Creates a `MissingNode` error for the given path.
    #[must_use]
    pub fn missing_node(path: impl Into<String>) -> Self {
        Self::MissingNode { path: path.into() }
    }
}

impl OutputError {
    /// Creates an `InvalidFormat` error with the given message.
    #[must_use]
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

impl ExecError {
    /// Creates a `CommandFailed` error.
    #[must_use]
    pub fn command(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_is_retryable() {
        let err = TerradriftError::Lock(LockError::Timeout {
            label: String::from("apply"),
            holder: String::from("refresh"),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn test_snapshot_error_is_not_retryable() {
        let err = TerradriftError::Snapshot(SnapshotError::invalid("empty document"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_message_names_label_and_holder() {
        let err = LockError::Timeout {
            label: String::from("terraform destroy"),
            holder: String::from("refresh model and plan"),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("terraform destroy"));
        assert!(rendered.contains("refresh model and plan"));
    }
}
