use super::{decode_segment, glob_match, is_value_entry, pk_from_target, Index, IndexOptions};
use crate::error::{IndexError, IndexResult};
use crate::option::IndexKind;
use async_trait::async_trait;
use pubshare_metadata::{path, MetadataStorage};
use std::sync::Arc;
use tracing::debug;

/// One pointer per value: `<namespace>/<value> -> <entity_dir>/<pk>`.
pub struct UniqueIndex {
    storage: Arc<dyn MetadataStorage>,
    options: IndexOptions,
}

impl UniqueIndex {
    pub fn new(storage: Arc<dyn MetadataStorage>, options: IndexOptions) -> Self {
        Self { storage, options }
    }

    /// Returns the primary key stored under the entry at `link`, if any.
    async fn owner_of(&self, link: &str) -> IndexResult<Option<String>> {
        match self.storage.resolve_symlink(link).await {
            Ok(target) => Ok(Some(pk_from_target(&target))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Index for UniqueIndex {
    async fn init(&self) -> IndexResult<()> {
        self.storage.make_dir_if_not_exist(&self.options.namespace).await?;
        Ok(())
    }

    async fn add(&self, pk: &str, value: &str) -> IndexResult<Option<String>> {
        let normalized = self.options.normalize(value).into_owned();
        let link = self.options.value_path(value);
        match self.storage.create_symlink(&self.options.target(pk), &link).await {
            Ok(()) => Ok(Some(normalized)),
            Err(e) if e.is_already_exists() => match self.owner_of(&link).await? {
                Some(existing) if existing == pk => Ok(Some(normalized)),
                _ => Err(IndexError::AlreadyExists {
                    type_name: self.options.type_name.clone(),
                    field: self.options.field.clone(),
                    value: normalized,
                }),
            },
            Err(e) => Err(e.into()),
        }
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
        match self.owner_of(&link).await? {
            Some(existing) if existing == pk => {}
            Some(existing) => {
                debug!(field = %self.options.field, %existing, pk, "entry belongs to another key, not removed");
                return Ok(());
            }
            None => return Ok(()),
        }
        match self.storage.delete(&link).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, pk: &str, old: &str, new: &str) -> IndexResult<()> {
        // Both values map to the same entry.
        if self.options.normalize(old) == self.options.normalize(new) {
            return Ok(());
        }
        self.add(pk, new).await?;
        self.remove(pk, old).await
    }

    async fn search(&self, pattern: &str) -> IndexResult<Vec<String>> {
        let pattern = self.options.normalize(pattern);
        let entries = match self.storage.list_dir(&self.options.namespace).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut pks = Vec::new();
        for entry in entries.iter().filter(|e| is_value_entry(&e.name)) {
            if !glob_match(&pattern, &decode_segment(&entry.name)) {
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
        IndexKind::Unique
    }

    fn field(&self) -> &str {
        &self.options.field
    }

    fn namespace(&self) -> &str {
        &self.options.namespace
    }
}
