//! Metadata storage over a local directory tree.
//!
//! Pointer records are real filesystem symlinks whose (possibly dangling)
//! target is the logical storage path they refer to.

use crate::error::{MetadataError, MetadataResult};
use crate::path;
use crate::storage::{DirEntry, MetadataStorage, NodeKind};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Metadata storage rooted at a local directory.
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Creates a store rooted at `root`. Nothing is touched until [`MetadataStorage::init`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, raw: &str) -> MetadataResult<(String, PathBuf)> {
        let p = path::normalize(raw)?;
        let mut full = self.root.clone();
        for segment in p.split('/').filter(|s| !s.is_empty()) {
            full.push(segment);
        }
        Ok((p, full))
    }

    fn resolve_non_root(&self, raw: &str) -> MetadataResult<(String, PathBuf)> {
        let (p, full) = self.resolve(raw)?;
        if p.is_empty() {
            return Err(MetadataError::InvalidPath(raw.to_string()));
        }
        Ok((p, full))
    }
}

fn map_io(err: std::io::Error, p: &str) -> MetadataError {
    match err.kind() {
        ErrorKind::NotFound => MetadataError::NotFound(p.to_string()),
        ErrorKind::AlreadyExists => MetadataError::AlreadyExists(p.to_string()),
        _ => MetadataError::Io(err),
    }
}

async fn kind_at(full: &Path) -> std::io::Result<Option<NodeKind>> {
    match fs::symlink_metadata(full).await {
        Ok(meta) => {
            let ft = meta.file_type();
            Ok(Some(if ft.is_symlink() {
                NodeKind::Symlink
            } else if ft.is_dir() {
                NodeKind::Directory
            } else {
                NodeKind::File
            }))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
async fn make_symlink(target: &str, link: &Path) -> std::io::Result<()> {
    fs::symlink(target, link).await
}

#[cfg(windows)]
async fn make_symlink(target: &str, link: &Path) -> std::io::Result<()> {
    fs::symlink_file(target, link).await
}

#[async_trait]
impl MetadataStorage for DiskStorage {
    fn backend(&self) -> &'static str {
        "disk"
    }

    async fn init(&self, namespace: &str) -> MetadataResult<()> {
        fs::create_dir_all(&self.root).await?;
        debug!(namespace, root = %self.root.display(), "disk metadata storage initialized");
        Ok(())
    }

    async fn upload(&self, raw: &str, content: &[u8]) -> MetadataResult<()> {
        let (p, full) = self.resolve_non_root(raw)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        match kind_at(&full).await? {
            Some(NodeKind::File) | None => {}
            Some(_) => {
                return Err(MetadataError::WrongKind {
                    path: p,
                    expected: NodeKind::File,
                });
            }
        }
        fs::write(&full, content).await.map_err(|e| map_io(e, &p))
    }

    async fn download(&self, raw: &str) -> MetadataResult<Vec<u8>> {
        let (p, full) = self.resolve_non_root(raw)?;
        match kind_at(&full).await? {
            None => Err(MetadataError::NotFound(p)),
            Some(NodeKind::File) => fs::read(&full).await.map_err(|e| map_io(e, &p)),
            Some(_) => Err(MetadataError::WrongKind {
                path: p,
                expected: NodeKind::File,
            }),
        }
    }

    async fn delete(&self, raw: &str) -> MetadataResult<()> {
        let (p, full) = self.resolve_non_root(raw)?;
        match kind_at(&full).await? {
            None => Err(MetadataError::NotFound(p)),
            Some(NodeKind::Directory) => fs::remove_dir_all(&full).await.map_err(|e| map_io(e, &p)),
            Some(_) => fs::remove_file(&full).await.map_err(|e| map_io(e, &p)),
        }
    }

    async fn list_dir(&self, raw: &str) -> MetadataResult<Vec<DirEntry>> {
        let (p, full) = self.resolve(raw)?;
        match kind_at(&full).await? {
            None => return Err(MetadataError::NotFound(p)),
            Some(NodeKind::Directory) => {}
            Some(_) => {
                return Err(MetadataError::WrongKind {
                    path: p,
                    expected: NodeKind::Directory,
                });
            }
        }

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full).await.map_err(|e| map_io(e, &p))?;
        while let Some(entry) = dir.next_entry().await? {
            let ft = entry.file_type().await?;
            let kind = if ft.is_symlink() {
                NodeKind::Symlink
            } else if ft.is_dir() {
                NodeKind::Directory
            } else {
                NodeKind::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn make_dir_if_not_exist(&self, raw: &str) -> MetadataResult<()> {
        let (p, full) = self.resolve(raw)?;
        match kind_at(&full).await? {
            Some(NodeKind::Directory) => Ok(()),
            Some(_) => Err(MetadataError::WrongKind {
                path: p,
                expected: NodeKind::Directory,
            }),
            None => fs::create_dir_all(&full).await.map_err(|e| map_io(e, &p)),
        }
    }

    async fn create_symlink(&self, target: &str, raw_link: &str) -> MetadataResult<()> {
        let (link, full) = self.resolve_non_root(raw_link)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        if kind_at(&full).await?.is_some() {
            return Err(MetadataError::AlreadyExists(link));
        }
        make_symlink(target, &full).await.map_err(|e| map_io(e, &link))
    }

    async fn resolve_symlink(&self, raw_link: &str) -> MetadataResult<String> {
        let (link, full) = self.resolve_non_root(raw_link)?;
        match kind_at(&full).await? {
            None => Err(MetadataError::NotFound(link)),
            Some(NodeKind::Symlink) => {
                let target = fs::read_link(&full).await.map_err(|e| map_io(e, &link))?;
                Ok(target.to_string_lossy().into_owned())
            }
            Some(_) => Err(MetadataError::WrongKind {
                path: link,
                expected: NodeKind::Symlink,
            }),
        }
    }
}
