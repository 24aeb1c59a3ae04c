//! The storage abstraction consumed by the indexer and the share manager.

use crate::error::MetadataResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a node in the metadata tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
}

impl NodeKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "directory" => Some(Self::Directory),
            "symlink" => Some(Self::Symlink),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// The entry's name within its directory.
    pub name: String,
    pub kind: NodeKind,
}

/// Hierarchical blob store with directories and pointer records.
///
/// Every call is one round-trip to the backend. Implementations do not retry
/// and do not time out on their own.
#[async_trait]
pub trait MetadataStorage: Send + Sync {
    /// Returns the name of the backend.
    fn backend(&self) -> &'static str;

    /// Prepares the backend for use by the named service.
    async fn init(&self, namespace: &str) -> MetadataResult<()>;

    /// Writes a blob, replacing any previous content. Missing parent
    /// directories are created.
    async fn upload(&self, path: &str, content: &[u8]) -> MetadataResult<()>;

    /// Reads a blob.
    async fn download(&self, path: &str) -> MetadataResult<Vec<u8>>;

    /// Deletes a node. Directories are deleted recursively.
    async fn delete(&self, path: &str) -> MetadataResult<()>;

    /// Lists a directory, sorted by name.
    async fn list_dir(&self, path: &str) -> MetadataResult<Vec<DirEntry>>;

    /// Creates a directory and its missing ancestors.
    async fn make_dir_if_not_exist(&self, path: &str) -> MetadataResult<()>;

    /// Creates a pointer at `link` referring to `target`.
    ///
    /// The target need not exist. Fails with `AlreadyExists` if any node
    /// occupies `link`.
    async fn create_symlink(&self, target: &str, link: &str) -> MetadataResult<()>;

    /// Returns the target of the pointer at `link`.
    async fn resolve_symlink(&self, link: &str) -> MetadataResult<String>;
}
