//! Identifier types for users, resources and shares.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a user across identity providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId {
    /// The identity provider that issued the id.
    pub idp: String,
    /// The provider-local opaque id.
    pub opaque_id: String,
}

impl UserId {
    /// Creates a user id.
    pub fn new(idp: impl Into<String>, opaque_id: impl Into<String>) -> Self {
        Self {
            idp: idp.into(),
            opaque_id: opaque_id.into(),
        }
    }

    /// Returns the value under which this user is indexed.
    ///
    /// The provider and the opaque id are joined with `:` and URL-escaped so
    /// the result is a single path-safe token.
    pub fn index_key(&self) -> String {
        urlencoding::encode(&format!("{}:{}", self.idp, self.opaque_id)).into_owned()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.idp, self.opaque_id)
    }
}

impl FromStr for UserId {
    type Err = Error;

    /// Parses `idp:opaque_id`. The opaque id may itself contain `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((idp, opaque)) if !opaque.is_empty() => Ok(Self::new(idp, opaque)),
            _ => Err(Error::InvalidUserId(s.to_string())),
        }
    }
}

/// Identifies a resource (file, folder or space root) in a storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub storage_id: String,
    pub opaque_id: String,
}

impl ResourceId {
    pub fn new(storage_id: impl Into<String>, opaque_id: impl Into<String>) -> Self {
        Self {
            storage_id: storage_id.into(),
            opaque_id: opaque_id.into(),
        }
    }

    /// Returns the composite value under which shares of this resource are indexed.
    pub fn index_key(&self) -> String {
        format!("{}!{}", self.storage_id, self.opaque_id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.index_key())
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    /// Parses `storage_id!opaque_id`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('!') {
            Some((storage, opaque)) if !storage.is_empty() && !opaque.is_empty() => {
                Ok(Self::new(storage, opaque))
            }
            _ => Err(Error::InvalidResourceId(s.to_string())),
        }
    }
}

/// Internal identifier of a public share, independent of its token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicShareId {
    pub opaque_id: String,
}

impl PublicShareId {
    pub fn new(opaque_id: impl Into<String>) -> Self {
        Self {
            opaque_id: opaque_id.into(),
        }
    }
}

impl fmt::Display for PublicShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.opaque_id)
    }
}
