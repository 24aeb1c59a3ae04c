use super::{decode_segment, glob_match, is_value_entry, pk_from_target, Index, IndexOptions};
use crate::error::{IndexError, IndexResult};
use crate::option::IndexKind;
use async_trait::async_trait;
use pubshare_metadata::{path, MetadataStorage};
use std::sync::Arc;
use tracing::debug;

const COUNTER: &str = ".counter";

/// Hands out increasing numbers: `<namespace>/<n> -> <entity_dir>/<pk>`.
///
/// The last issued number is kept in `<namespace>/.counter`, so numbers are
/// never reused after a removal.
pub struct AutoincrementIndex {
    storage: Arc<dyn MetadataStorage>,
    options: IndexOptions,
}

impl AutoincrementIndex {
    pub fn new(storage: Arc<dyn MetadataStorage>, options: IndexOptions) -> Self {
        Self { storage, options }
    }

    fn counter_path(&self) -> String {
        path::join(&self.options.namespace, COUNTER)
    }

    async fn last_issued(&self) -> IndexResult<u64> {
        match self.storage.download(&self.counter_path()).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes)
                .trim()
                .parse()
                .map_err(|_| IndexError::Extraction(format!("corrupt counter in {}", self.options.namespace))),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    async fn owner_of(&self, link: &str) -> IndexResult<Option<String>> {
        match self.storage.resolve_symlink(link).await {
            Ok(target) => Ok(Some(pk_from_target(&target))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Index for AutoincrementIndex {
    async fn init(&self) -> IndexResult<()> {
        self.storage.make_dir_if_not_exist(&self.options.namespace).await?;
        Ok(())
    }

    async fn add(&self, pk: &str, _value: &str) -> IndexResult<Option<String>> {
        let bound = self.options.bound;
        let mut next = (self.last_issued().await? + 1).max(bound.first());
        loop {
            if bound.exceeded_by(next) {
                return Err(IndexError::OutOfBounds {
                    value: next,
                    bound: bound.upper,
                });
            }
            let link = self.options.value_path(&next.to_string());
            match self.storage.create_symlink(&self.options.target(pk), &link).await {
                Ok(()) => break,
                // an entry written by hand or a lost counter update
                Err(e) if e.is_already_exists() => next += 1,
                Err(e) => return Err(e.into()),
            }
        }
        self.storage
            .upload(&self.counter_path(), next.to_string().as_bytes())
            .await?;
        debug!(field = %self.options.field, value = next, pk, "autoincrement value issued");
        Ok(Some(next.to_string()))
    }

    async fn lookup(&self, values: &[String]) -> IndexResult<Vec<String>> {
        let mut pks = Vec::new();
        for value in values.iter().filter(|v| !v.is_empty()) {
            if let Some(pk) = self.owner_of(&self.options.value_path(value)).await? {
                pks.push(pk);
            }
        }
        Ok(pks)
    }

    async fn remove(&self, pk: &str, value: &str) -> IndexResult<()> {
        let link = self.options.value_path(value);
        if self.owner_of(&link).await?.as_deref() != Some(pk) {
            return Ok(());
        }
        match self.storage.delete(&link).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-points an entry to an explicit number without touching the counter.
    async fn update(&self, pk: &str, old: &str, new: &str) -> IndexResult<()> {
        if self.options.normalize(old) == self.options.normalize(new) {
            return Ok(());
        }
        let link = self.options.value_path(new);
        match self.storage.create_symlink(&self.options.target(pk), &link).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                if self.owner_of(&link).await?.as_deref() != Some(pk) {
                    return Err(IndexError::AlreadyExists {
                        type_name: self.options.type_name.clone(),
                        field: self.options.field.clone(),
                        value: new.to_string(),
                    });
                }
            }
            Err(e) => return Err(e.into()),
        }
        self.remove(pk, old).await
    }

    async fn search(&self, pattern: &str) -> IndexResult<Vec<String>> {
        let entries = match self.storage.list_dir(&self.options.namespace).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut pks = Vec::new();
        for entry in entries.iter().filter(|e| is_value_entry(&e.name)) {
            if !glob_match(pattern, &decode_segment(&entry.name)) {
                continue;
            }
            let link = path::join(&self.options.namespace, &entry.name);
            if let Some(pk) = self.owner_of(&link).await? {
                pks.push(pk);
            }
        }
        Ok(pks)
    }

    async fn delete(&self) -> IndexResult<()> {
        match self.storage.delete(&self.options.namespace).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Autoincrement
    }

    fn field(&self) -> &str {
        &self.options.field
    }

    fn namespace(&self) -> &str {
        &self.options.namespace
    }
}
