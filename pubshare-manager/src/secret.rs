//! The persisted form of a share.

use pubshare_types::PublicShare;
use serde::{Deserialize, Serialize};

/// A share together with its password hash.
///
/// `password` holds the hash, or is empty when the share has no password.
/// This is the only form written to storage; the hash never leaves the
/// manager through its share operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareWithSecret {
    pub public_share: PublicShare,
    #[serde(default)]
    pub password: String,
}

impl ShareWithSecret {
    pub fn new(public_share: PublicShare, password_hash: impl Into<String>) -> Self {
        Self {
            public_share,
            password: password_hash.into(),
        }
    }
}
