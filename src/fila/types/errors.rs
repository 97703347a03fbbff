/*!
 * Fila Error Types
 * Structured, type-safe error handling for storage operations
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keyva::KeyvaError;

/// Storage operation result
pub type FilaResult<T> = Result<T, FilaError>;

/// Storage errors shared by every backend
///
/// Backends map their transport failures into these variants at the
/// boundary; nothing platform specific leaks past the `Backend` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum FilaError {
    #[error("Not found: {0}")]
    #[diagnostic(code(fila::not_found))]
    NotFound(String),

    #[error("Already exists: {0}")]
    #[diagnostic(code(fila::already_exists))]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    #[diagnostic(code(fila::not_a_directory))]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    #[diagnostic(code(fila::is_a_directory))]
    IsADirectory(String),

    #[error("Invalid path: {0}")]
    #[diagnostic(code(fila::invalid_path))]
    InvalidPath(String),

    #[error("{operation} is not supported by the {backend} backend")]
    #[diagnostic(
        code(fila::unsupported),
        help("Check the capability surface of the active backend before calling this operation.")
    )]
    Unsupported {
        operation: String,
        backend: String,
    },

    #[error("Write failed for {path}: {reason}")]
    #[diagnostic(code(fila::write_failure))]
    WriteFailure { path: String, reason: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(fila::io))]
    Io(String),

    #[error("Plugin error: {0}")]
    #[diagnostic(code(fila::plugin))]
    Plugin(String),

    #[error("Transaction failed: {0}")]
    #[diagnostic(code(fila::transaction))]
    Transaction(String),

    #[error("Watch failed: {0}")]
    #[diagnostic(code(fila::watch))]
    Watch(String),

    #[error("A storage backend is already registered for this process")]
    #[diagnostic(
        code(fila::already_registered),
        help("Install the registry exactly once, from the platform entry point.")
    )]
    AlreadyRegistered,

    #[error("No storage backend has been registered")]
    #[diagnostic(code(fila::not_registered))]
    NotRegistered,
}

impl FilaError {
    /// Shorthand for an `Unsupported` error
    pub fn unsupported(operation: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            backend: backend.into(),
        }
    }

    /// Wrap a failure that happened while writing `path`
    ///
    /// Errors that already carry a precise meaning pass through unchanged.
    pub fn write_failure(path: impl Into<String>, cause: FilaError) -> Self {
        match cause {
            FilaError::NotFound(_)
            | FilaError::Unsupported { .. }
            | FilaError::NotADirectory(_)
            | FilaError::IsADirectory(_)
            | FilaError::AlreadyExists(_)
            | FilaError::WriteFailure { .. } => cause,
            other => FilaError::WriteFailure {
                path: path.into(),
                reason: other.to_string(),
            },
        }
    }

    /// Convert std::io::Error to FilaError
    pub fn from_io(e: std::io::Error, context: impl Into<String>) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => FilaError::NotFound(context.into()),
            ErrorKind::AlreadyExists => FilaError::AlreadyExists(context.into()),
            _ => FilaError::Io(format!("{}: {}", context.into(), e)),
        }
    }

    /// Check whether this is an `Unsupported` error
    #[inline]
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, FilaError::Unsupported { .. })
    }
}

impl From<KeyvaError> for FilaError {
    fn from(err: KeyvaError) -> Self {
        FilaError::Transaction(err.to_string())
    }
}

/// Failure reported by a platform plugin transport
///
/// Mobile and desktop hosts reject with free-form messages; the bridge
/// classifies the few outcomes callers branch on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("{0} does not exist")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0}")]
    Failed(String),
}

impl From<PluginError> for FilaError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::NotFound(path) => FilaError::NotFound(path),
            PluginError::AlreadyExists(path) => FilaError::AlreadyExists(path),
            PluginError::Failed(message) => FilaError::Plugin(message),
        }
    }
}
