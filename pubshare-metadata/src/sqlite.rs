//! SQLite-backed metadata storage.
//!
//! The whole tree lives in one table keyed by canonical path. Directories are
//! explicit rows so empty directories survive and listings stay cheap.

use crate::error::{MetadataError, MetadataResult};
use crate::path;
use crate::storage::{DirEntry, MetadataStorage, NodeKind};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Metadata storage in a single SQLite database.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> MetadataResult<Self> {
        let conn = Connection::open(path)?;
        Self::open_with_conn(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> MetadataResult<Self> {
        Self::open_with_conn(Connection::open_in_memory()?)
    }

    fn open_with_conn(conn: Connection) -> MetadataResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> MetadataResult<()> {
        self.conn().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS nodes (
                path TEXT PRIMARY KEY,
                parent TEXT NOT NULL,
                kind TEXT NOT NULL,
                content BLOB,
                target TEXT
            );

            CREATE INDEX IF NOT EXISTS nodes_parent ON nodes (parent);

            CREATE TABLE IF NOT EXISTS namespaces (
                name TEXT PRIMARY KEY
            );
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn kind_of(conn: &Connection, path: &str) -> MetadataResult<Option<NodeKind>> {
    if path.is_empty() {
        return Ok(Some(NodeKind::Directory));
    }
    let kind: Option<String> = conn
        .query_row("SELECT kind FROM nodes WHERE path = ?1", params![path], |row| row.get(0))
        .optional()?;
    Ok(kind.and_then(|k| NodeKind::parse(&k)))
}

/// Creates `dir` and its ancestors as directory rows.
fn ensure_dir(conn: &Connection, dir: &str) -> MetadataResult<()> {
    if dir.is_empty() {
        return Ok(());
    }
    let mut chain = path::ancestors(dir);
    chain.push(dir);
    for current in chain {
        match kind_of(conn, current)? {
            Some(NodeKind::Directory) => {}
            Some(_) => {
                return Err(MetadataError::WrongKind {
                    path: current.to_string(),
                    expected: NodeKind::Directory,
                });
            }
            None => {
                conn.execute(
                    "INSERT INTO nodes (path, parent, kind) VALUES (?1, ?2, ?3)",
                    params![current, path::parent(current), NodeKind::Directory.as_str()],
                )?;
            }
        }
    }
    Ok(())
}

fn non_root(raw: &str) -> MetadataResult<String> {
    let p = path::normalize(raw)?;
    if p.is_empty() {
        return Err(MetadataError::InvalidPath(raw.to_string()));
    }
    Ok(p)
}

#[async_trait]
impl MetadataStorage for SqliteStorage {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn init(&self, namespace: &str) -> MetadataResult<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO namespaces (name) VALUES (?1)",
            params![namespace],
        )?;
        debug!(namespace, "sqlite metadata storage initialized");
        Ok(())
    }

    async fn upload(&self, raw: &str, content: &[u8]) -> MetadataResult<()> {
        let p = non_root(raw)?;
        let conn = self.conn();
        ensure_dir(&conn, path::parent(&p))?;
        match kind_of(&conn, &p)? {
            Some(NodeKind::File) | None => {}
            Some(_) => {
                return Err(MetadataError::WrongKind {
                    path: p,
                    expected: NodeKind::File,
                });
            }
        }
        conn.execute(
            "INSERT OR REPLACE INTO nodes (path, parent, kind, content, target) VALUES (?1, ?2, ?3, ?4, NULL)",
            params![p, path::parent(&p), NodeKind::File.as_str(), content],
        )?;
        Ok(())
    }

    async fn download(&self, raw: &str) -> MetadataResult<Vec<u8>> {
        let p = non_root(raw)?;
        let row: Option<(String, Option<Vec<u8>>)> = self
            .conn()
            .query_row(
                "SELECT kind, content FROM nodes WHERE path = ?1",
                params![p],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            None => Err(MetadataError::NotFound(p)),
            Some((kind, content)) if kind == NodeKind::File.as_str() => {
                Ok(content.unwrap_or_default())
            }
            Some(_) => Err(MetadataError::WrongKind {
                path: p,
                expected: NodeKind::File,
            }),
        }
    }

    async fn delete(&self, raw: &str) -> MetadataResult<()> {
        let p = non_root(raw)?;
        let conn = self.conn();
        if kind_of(&conn, &p)?.is_none() {
            return Err(MetadataError::NotFound(p));
        }
        let prefix = format!("{p}/");
        conn.execute(
            "DELETE FROM nodes WHERE path = ?1 OR substr(path, 1, ?3) = ?2",
            params![p, prefix, prefix.chars().count() as i64],
        )?;
        Ok(())
    }

    async fn list_dir(&self, raw: &str) -> MetadataResult<Vec<DirEntry>> {
        let p = path::normalize(raw)?;
        let conn = self.conn();
        match kind_of(&conn, &p)? {
            None => return Err(MetadataError::NotFound(p)),
            Some(NodeKind::Directory) => {}
            Some(_) => {
                return Err(MetadataError::WrongKind {
                    path: p,
                    expected: NodeKind::Directory,
                });
            }
        }

        let mut stmt = conn.prepare("SELECT path, kind FROM nodes WHERE parent = ?1 ORDER BY path")?;
        let rows = stmt.query_map(params![p], |row| {
            let path: String = row.get(0)?;
            let kind: String = row.get(1)?;
            Ok((path, kind))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (child, kind) = row?;
            let Some(kind) = NodeKind::parse(&kind) else {
                continue;
            };
            entries.push(DirEntry {
                name: path::base(&child).to_string(),
                kind,
            });
        }
        Ok(entries)
    }

    async fn make_dir_if_not_exist(&self, raw: &str) -> MetadataResult<()> {
        let p = path::normalize(raw)?;
        ensure_dir(&self.conn(), &p)
    }

    async fn create_symlink(&self, target: &str, raw_link: &str) -> MetadataResult<()> {
        let link = non_root(raw_link)?;
        let conn = self.conn();
        ensure_dir(&conn, path::parent(&link))?;
        if kind_of(&conn, &link)?.is_some() {
            return Err(MetadataError::AlreadyExists(link));
        }
        conn.execute(
            "INSERT INTO nodes (path, parent, kind, target) VALUES (?1, ?2, ?3, ?4)",
            params![link, path::parent(&link), NodeKind::Symlink.as_str(), target],
        )?;
        Ok(())
    }

    async fn resolve_symlink(&self, raw_link: &str) -> MetadataResult<String> {
        let link = non_root(raw_link)?;
        let row: Option<(String, Option<String>)> = self
            .conn()
            .query_row(
                "SELECT kind, target FROM nodes WHERE path = ?1",
                params![link],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            None => Err(MetadataError::NotFound(link)),
            Some((kind, Some(target))) if kind == NodeKind::Symlink.as_str() => Ok(target),
            Some(_) => Err(MetadataError::WrongKind {
                path: link,
                expected: NodeKind::Symlink,
            }),
        }
    }
}
