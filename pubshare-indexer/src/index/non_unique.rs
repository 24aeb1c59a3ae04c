use super::{decode_segment, encode_segment, glob_match, is_value_entry, Index, IndexOptions};
use crate::error::IndexResult;
use crate::option::IndexKind;
use async_trait::async_trait;
use pubshare_metadata::{path, MetadataStorage, NodeKind};
use std::sync::Arc;

/// A directory per value holding one pointer per primary key:
/// `<namespace>/<value>/<pk> -> <entity_dir>/<pk>`.
pub struct NonUniqueIndex {
    storage: Arc<dyn MetadataStorage>,
    options: IndexOptions,
}

impl NonUniqueIndex {
    pub fn new(storage: Arc<dyn MetadataStorage>, options: IndexOptions) -> Self {
        Self { storage, options }
    }

    async fn keys_in(&self, dir: &str) -> IndexResult<Vec<String>> {
        match self.storage.list_dir(dir).await {
            Ok(entries) => Ok(entries
                .iter()
                .filter(|e| e.kind == NodeKind::Symlink)
                .map(|e| decode_segment(&e.name))
                .collect()),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Index for NonUniqueIndex {
    async fn init(&self) -> IndexResult<()> {
        self.storage.make_dir_if_not_exist(&self.options.namespace).await?;
        Ok(())
    }

    async fn add(&self, pk: &str, value: &str) -> IndexResult<Option<String>> {
        let dir = self.options.value_path(value);
        self.storage.make_dir_if_not_exist(&dir).await?;
        let link = path::join(&dir, &encode_segment(pk));
        match self.storage.create_symlink(&self.options.target(pk), &link).await {
            Ok(()) => Ok(None),
            Err(e) if e.is_already_exists() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn lookup(&self, values: &[String]) -> IndexResult<Vec<String>> {
        let mut pks = Vec::new();
        for value in values.iter().filter(|v| !v.is_empty()) {
            pks.extend(self.keys_in(&self.options.value_path(value)).await?);
        }
        Ok(pks)
    }

    async fn remove(&self, pk: &str, value: &str) -> IndexResult<()> {
        let dir = self.options.value_path(value);
        match self.storage.delete(&path::join(&dir, &encode_segment(pk))).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        // drop the value directory with its last entry
        match self.storage.list_dir(&dir).await {
            Ok(rest) if rest.is_empty() => match self.storage.delete(&dir).await {
                Ok(()) => Ok(()),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(e.into()),
            },
            Ok(_) => Ok(()),
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
        for entry in entries.iter().filter(|e| e.kind == NodeKind::Directory && is_value_entry(&e.name)) {
            if glob_match(&pattern, &decode_segment(&entry.name)) {
                let dir = path::join(&self.options.namespace, &entry.name);
                pks.extend(self.keys_in(&dir).await?);
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
        IndexKind::NonUnique
    }

    fn field(&self) -> &str {
        &self.options.field
    }

    fn namespace(&self) -> &str {
        &self.options.namespace
    }
}
