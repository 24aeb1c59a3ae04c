//! Hierarchical metadata storage for the public share engine.
//!
//! Exposes the small set of blob, directory and pointer primitives that the
//! indexer and the share manager are written against, plus two backends:
//!
//! - [`SqliteStorage`]: a single SQLite file (or an in-memory database)
//! - [`DiskStorage`]: a plain directory tree on the local filesystem
//!
//! # Paths
//!
//! Paths are `/`-separated and relative to the store root. Leading and
//! trailing slashes are ignored; empty segments, `.` and `..` are rejected.
//! The empty path denotes the root directory, which always exists.

mod disk;
mod error;
pub mod path;
mod sqlite;
mod storage;

pub use disk::DiskStorage;
pub use error::{MetadataError, MetadataResult};
pub use sqlite::SqliteStorage;
pub use storage::{DirEntry, MetadataStorage, NodeKind};
