//! Cryptographic primitives for public shares.
//!
//! - Argon2id password hashing with a configurable cost ([`hash_password`])
//! - HMAC-SHA512 link signatures bound to a token, a secret and an expiry
//!   ([`create_signature`])
//! - Random tokens from an alphabet without look-alike characters
//!   ([`random_string`])

mod error;
mod password;
mod signature;
mod token;

pub use error::{CryptoError, CryptoResult};
pub use password::{hash_password, verify_password, HashCost};
pub use signature::{create_signature, signature_expiry, verify_signature, DEFAULT_SIGNATURE_TTL_SECS};
pub use token::{random_string, TOKEN_ALPHABET, TOKEN_LENGTH};
