//! Public (anonymous link) shares and the requests that operate on them.

use crate::entity::Indexable;
use crate::ids::{PublicShareId, ResourceId, UserId};
use crate::resource::ResourcePermissions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A public link to a resource.
///
/// `token` and `id` are assigned once at creation and never change, as are
/// `owner`, `creator` and `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicShare {
    pub id: PublicShareId,
    /// URL-safe secret identifying the link. Doubles as its storage key.
    pub token: String,
    pub owner: UserId,
    pub creator: UserId,
    pub resource_id: ResourceId,
    pub permissions: ResourcePermissions,
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
    pub display_name: String,
    #[serde(default)]
    pub quicklink: bool,
    #[serde(default)]
    pub password_protected: bool,
    /// Attached on read when a signature was requested. Never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<ShareSignature>,
}

impl PublicShare {
    /// Returns true if the share carries an expiration that lies before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| exp < now)
    }

    /// Returns true if the share has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl Indexable for PublicShare {
    const TYPE_NAME: &'static str = "PublicShare";
}

/// Time-bound proof derived from a share's password hash.
///
/// Lets the holder open a password-protected link without re-entering the
/// password until `expiration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSignature {
    pub signature: String,
    pub expiration: DateTime<Utc>,
}

/// What a new share grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    #[serde(default)]
    pub permissions: ResourcePermissions,
    /// Cleartext password. Empty or absent means no password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

impl Grant {
    pub fn new(permissions: ResourcePermissions) -> Self {
        Self {
            permissions,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

/// Addresses an existing share either by its token or by its opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicShareReference {
    Token(String),
    Id(PublicShareId),
}

impl PublicShareReference {
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(token.into())
    }

    pub fn id(opaque_id: impl Into<String>) -> Self {
        Self::Id(PublicShareId::new(opaque_id))
    }
}

/// A single-field mutation of a share.
///
/// Unknown update types received over the wire deserialize to
/// [`ShareUpdate::Unspecified`] and are rejected by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShareUpdate {
    DisplayName { display_name: String },
    Permissions { permissions: ResourcePermissions },
    Expiration {
        #[serde(default)]
        expiration: Option<DateTime<Utc>>,
    },
    /// An empty password removes password protection.
    Password { password: String },
    #[serde(other)]
    Unspecified,
}

/// Credentials presented when redeeming a token anonymously.
///
/// When both are present the password is checked and the signature ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareAuthentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<ShareSignature>,
}

impl ShareAuthentication {
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            signature: None,
        }
    }

    pub fn signature(signature: ShareSignature) -> Self {
        Self {
            password: None,
            signature: Some(signature),
        }
    }
}
