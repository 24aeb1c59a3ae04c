//! Error types for the metadata storage layer.

use crate::storage::NodeKind;
use thiserror::Error;

/// Result type for metadata storage operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors that can occur in metadata storage operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Nothing exists at the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// A node already exists at the path.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The node at the path has a different kind than the operation needs.
    #[error("{path} is not a {expected}")]
    WrongKind { path: String, expected: NodeKind },

    /// The path is malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    /// Returns true for [`MetadataError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for [`MetadataError::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}
