//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Hashing cost parameters were rejected.
    #[error("invalid hash cost: {0}")]
    InvalidCost(String),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// Signature computation failed.
    #[error("signature failed: {0}")]
    Signature(String),
}
