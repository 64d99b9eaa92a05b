//! Error types for session persistence and restore.

use std::path::PathBuf;

use thiserror::Error;

use crate::utils::storage::Namespace;

/// Errors raised by the session core and its blob store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// IO error while touching the data directory.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to encode or decode a JSON record.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No record with this id in the namespace.
    #[error("{namespace} record not found: {id}")]
    NotFound { namespace: Namespace, id: String },

    /// Identifier is empty or not safe to use as a file name.
    #[error("Invalid session id: {0:?}")]
    InvalidId(String),

    /// Persisted data that cannot be coerced into any content variant.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The data directory could not be resolved or created.
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// A configuration file could not be parsed.
    #[error("Config error in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this is a missing-record error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound { .. })
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
