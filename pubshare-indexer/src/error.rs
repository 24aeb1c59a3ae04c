//! Error types for the indexer.

use pubshare_metadata::MetadataError;
use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur in index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A unique index already maps the value to a different primary key.
    #[error("{type_name}.{field} already has an entry for {value:?}")]
    AlreadyExists {
        type_name: String,
        field: String,
        value: String,
    },

    /// No index or entry for the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// Update was called with entities of different types.
    #[error("type mismatch: cannot update {from} into {to}")]
    TypeMismatch { from: String, to: String },

    /// The filter uses an operator the indexer cannot evaluate.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Unknown index kind name.
    #[error("invalid index type: {0}")]
    InvalidIndexType(String),

    /// The filter expression does not parse.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An autoincrement index ran past its upper bound.
    #[error("value {value} exceeds upper bound {bound}")]
    OutOfBounds { value: u64, bound: u64 },

    /// A primary key or field value could not be extracted from an entity.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Storage error.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl IndexError {
    /// Returns true for [`IndexError::NotFound`] and storage not-found errors.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Metadata(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Returns true for [`IndexError::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
