//! Public link shares.
//!
//! [`PublicShareManager`] issues anonymous links to resources, optionally
//! protected by a password and an expiration date, and resolves them again
//! by token. Shares live as blobs in a [`MetadataStorage`] and are found
//! through the secondary indexes of [`pubshare_indexer`].
//!
//! Visibility of other users' links is decided by a [`PermissionChecker`]
//! supplied by the caller.
//!
//! [`MetadataStorage`]: pubshare_metadata::MetadataStorage

mod config;
mod error;
mod manager;
mod migrate;
mod permissions;
mod secret;

pub use config::ManagerConfig;
pub use error::{ErrorKind, ShareError, ShareResult};
pub use manager::PublicShareManager;
pub use permissions::{DenyAllPermissions, PermissionChecker};
pub use secret::ShareWithSecret;
