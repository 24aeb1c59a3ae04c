//! Error types for the share manager.

use pubshare_crypto::CryptoError;
use pubshare_indexer::IndexError;
use pubshare_metadata::MetadataError;
use thiserror::Error;

/// Result type for share operations.
pub type ShareResult<T> = Result<T, ShareError>;

/// Errors that can occur in share operations.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Missing or expired share.
    #[error("not found: {0}")]
    NotFound(String),

    /// The share collides with an existing one.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Wrong password or an invalid or expired signature.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request is malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request uses something the manager cannot do.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Update across entity types.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Index error.
    #[error("index error: {0}")]
    Index(IndexError),

    /// Storage error.
    #[error("storage error: {0}")]
    Metadata(MetadataError),

    /// Hashing or signing failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The permission check could not be performed.
    #[error("permission check failed: {0}")]
    Permission(String),

    /// A dump or load channel was closed by the other side.
    #[error("channel closed")]
    ChannelClosed,
}

/// Coarse classification of a [`ShareError`] for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidCredentials,
    BadRequest,
    NotSupported,
    Internal,
}

impl ShareError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::BadRequest(_) | Self::TypeMismatch(_) => ErrorKind::BadRequest,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::Index(_)
            | Self::Metadata(_)
            | Self::Crypto(_)
            | Self::Serialization(_)
            | Self::Permission(_)
            | Self::ChannelClosed => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<MetadataError> for ShareError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(path) => Self::NotFound(path),
            MetadataError::AlreadyExists(path) => Self::AlreadyExists(path),
            other => Self::Metadata(other),
        }
    }
}

impl From<IndexError> for ShareError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotFound(what) => Self::NotFound(what),
            IndexError::AlreadyExists { .. } => Self::AlreadyExists(err.to_string()),
            IndexError::TypeMismatch { .. } => Self::TypeMismatch(err.to_string()),
            IndexError::NotSupported(what) => Self::NotSupported(what),
            IndexError::InvalidQuery(what) => Self::BadRequest(what),
            IndexError::Metadata(inner) => inner.into(),
            other => Self::Index(other),
        }
    }
}
