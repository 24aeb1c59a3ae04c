//! Core type definitions for the public share engine.
//!
//! This crate defines the transport-agnostic types shared by the indexer,
//! the share manager and the command-line tooling:
//! - User and resource identifiers
//! - Resource metadata and permission sets
//! - Public shares, grants, references and update requests
//! - List filters and their matching rules
//! - The [`Indexable`] contract for entities held in secondary indexes

mod entity;
mod filter;
mod ids;
mod resource;
mod share;

pub use entity::Indexable;
pub use filter::{matches_filters, FilterType, ListFilter};
pub use ids::{PublicShareId, ResourceId, UserId};
pub use resource::{ResourceInfo, ResourcePermissions, User};
pub use share::{
    Grant, PublicShare, PublicShareReference, ShareAuthentication, ShareSignature, ShareUpdate,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("invalid resource id: {0}")]
    InvalidResourceId(String),
}
