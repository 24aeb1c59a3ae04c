//! The index registry.

use crate::config::IndexerConfig;
use crate::error::{IndexError, IndexResult};
use crate::index::{self, Index, IndexOptions};
use crate::lock::NamedRwLock;
use crate::option::{normalize_field_name, IndexBy, IndexDefinition, IndexKind};
use crate::query::{self, QueryLeaf};
use pubshare_metadata::{path, MetadataStorage};
use pubshare_types::Indexable;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

type Entity = dyn Any + Send + Sync;
type Extractor = Arc<dyn Fn(&Entity) -> Option<String> + Send + Sync>;

/// A field name and a value to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A value stored by a unique or autoincrement index during [`Indexer::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAddResult {
    pub field: String,
    pub value: String,
}

#[derive(Clone)]
struct Registered {
    index: Arc<dyn Index>,
    value: Extractor,
}

#[derive(Clone)]
struct TypeIndices {
    type_name: &'static str,
    primary_key_field: String,
    primary_key: Extractor,
    fields: BTreeMap<String, Vec<Registered>>,
}

impl TypeIndices {
    fn primary_key(&self, entity: &Entity) -> IndexResult<String> {
        let pk = (self.primary_key)(entity).ok_or_else(|| self.wrong_type(&self.primary_key_field))?;
        if pk.is_empty() {
            return Err(IndexError::Extraction(format!(
                "{}.{} is empty",
                self.type_name, self.primary_key_field
            )));
        }
        Ok(pk)
    }

    fn value(&self, field: &str, registered: &Registered, entity: &Entity) -> IndexResult<String> {
        (registered.value)(entity).ok_or_else(|| self.wrong_type(field))
    }

    fn wrong_type(&self, field: &str) -> IndexError {
        IndexError::Extraction(format!("cannot read {field} from entity: not a {}", self.type_name))
    }

    fn indexes_for(&self, field: &str) -> IndexResult<&[Registered]> {
        self.fields
            .get(field)
            .map(Vec::as_slice)
            .ok_or_else(|| IndexError::NotFound(format!("no index for {}.{field}", self.type_name)))
    }
}

fn erase<T: Indexable>(by: IndexBy<T>) -> Extractor {
    Arc::new(move |entity: &Entity| entity.downcast_ref::<T>().map(|e| by.value(e)))
}

/// Catalog of index primitives per entity type.
///
/// Mutations (`add`, `delete`, `update`, registration) hold the exclusive lock
/// of the entity type, lookups hold the shared lock. Types do not contend
/// with each other.
///
/// Multi-index mutations are not transactional: when one primitive fails,
/// the entries already written by earlier primitives stay in place.
pub struct Indexer {
    storage: Arc<dyn MetadataStorage>,
    config: IndexerConfig,
    catalog: RwLock<HashMap<&'static str, Arc<TypeIndices>>>,
    locks: NamedRwLock,
}

impl Indexer {
    pub fn new(storage: Arc<dyn MetadataStorage>, config: IndexerConfig) -> Self {
        Self {
            storage,
            config,
            catalog: RwLock::new(HashMap::new()),
            locks: NamedRwLock::default(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn MetadataStorage> {
        &self.storage
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    fn snapshot(&self, type_name: &str) -> Option<Arc<TypeIndices>> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        catalog.get(type_name).cloned()
    }

    fn indices(&self, type_name: &str) -> IndexResult<Arc<TypeIndices>> {
        self.snapshot(type_name)
            .ok_or_else(|| IndexError::NotFound(format!("no indexes registered for {type_name}")))
    }

    /// Returns true if any index is registered for `T`.
    pub fn is_registered<T: Indexable>(&self) -> bool {
        self.snapshot(T::TYPE_NAME).is_some()
    }

    /// Registers an index and creates its namespace.
    ///
    /// Registering the same field and kind twice is a no-op. All indexes of a
    /// type must share one primary key field.
    pub async fn register_index<T: Indexable>(&self, definition: IndexDefinition<T>) -> IndexResult<()> {
        let _guard = self.locks.write(T::TYPE_NAME).await;
        let IndexDefinition {
            kind,
            primary_key,
            by,
            case_insensitive,
            bound,
            entity_dir,
        } = definition;
        let field = by.name().to_string();

        if let Some(existing) = self.snapshot(T::TYPE_NAME) {
            if existing.primary_key_field != primary_key.name() {
                return Err(IndexError::Extraction(format!(
                    "{} is keyed by {}, not {}",
                    T::TYPE_NAME,
                    existing.primary_key_field,
                    primary_key.name()
                )));
            }
            let known = existing
                .fields
                .get(&field)
                .is_some_and(|list| list.iter().any(|r| r.index.kind() == kind));
            if known {
                return Ok(());
            }
        }

        let mut options = IndexOptions::new(&self.config.index_root, T::TYPE_NAME, &field, kind);
        options.entity_dir = entity_dir;
        options.case_insensitive = case_insensitive;
        options.bound = bound;
        let index = index::build(kind, Arc::clone(&self.storage), options);
        index.init().await?;

        let registered = Registered {
            index,
            value: erase(by),
        };
        {
            let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
            let entry = catalog.entry(T::TYPE_NAME).or_insert_with(|| {
                Arc::new(TypeIndices {
                    type_name: T::TYPE_NAME,
                    primary_key_field: primary_key.name().to_string(),
                    primary_key: erase(primary_key),
                    fields: BTreeMap::new(),
                })
            });
            Arc::make_mut(entry)
                .fields
                .entry(field.clone())
                .or_default()
                .push(registered);
        }
        info!(type_name = T::TYPE_NAME, %field, %kind, "index registered");
        Ok(())
    }

    /// Indexes `entity` in every index registered for its type.
    ///
    /// Empty field values are not indexed, except by autoincrement indexes,
    /// which ignore the value.
    pub async fn add<T: Indexable>(&self, entity: &T) -> IndexResult<Vec<IndexAddResult>> {
        let _guard = self.locks.write(T::TYPE_NAME).await;
        let indices = self.indices(T::TYPE_NAME)?;
        let entity: &Entity = entity;
        let pk = indices.primary_key(entity)?;

        let mut results = Vec::new();
        for (field, registered) in &indices.fields {
            for r in registered {
                let value = indices.value(field, r, entity)?;
                if value.is_empty() && r.index.kind() != IndexKind::Autoincrement {
                    continue;
                }
                debug!(type_name = T::TYPE_NAME, %field, kind = %r.index.kind(), %pk, "index add");
                if let Some(stored) = r.index.add(&pk, &value).await? {
                    results.push(IndexAddResult {
                        field: field.clone(),
                        value: stored,
                    });
                }
            }
        }
        Ok(results)
    }

    /// Returns the primary keys matching any of `fields`, deduplicated.
    pub async fn find_by<T: Indexable>(&self, fields: &[Field]) -> IndexResult<Vec<String>> {
        let _guard = self.locks.read(T::TYPE_NAME).await;
        let indices = self.indices(T::TYPE_NAME)?;

        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for f in fields {
            groups
                .entry(normalize_field_name(&f.name))
                .or_default()
                .push(f.value.clone());
        }

        let mut found = BTreeSet::new();
        for (field, values) in &groups {
            for r in indices.indexes_for(field)? {
                found.extend(r.index.lookup(values).await?);
            }
        }
        Ok(found.into_iter().collect())
    }

    /// Returns the primary keys whose `field` value matches the glob `pattern`.
    pub async fn find_by_partial<T: Indexable>(&self, field: &str, pattern: &str) -> IndexResult<Vec<String>> {
        let _guard = self.locks.read(T::TYPE_NAME).await;
        let indices = self.indices(T::TYPE_NAME)?;
        let field = normalize_field_name(field);

        let mut found = BTreeSet::new();
        for r in indices.indexes_for(&field)? {
            found.extend(r.index.search(pattern).await?);
        }
        Ok(found.into_iter().collect())
    }

    /// Removes `entity` from every index registered for its type.
    ///
    /// Values are recomputed from the entity. The first failing primitive
    /// aborts the remaining removals.
    pub async fn delete<T: Indexable>(&self, entity: &T) -> IndexResult<()> {
        let _guard = self.locks.write(T::TYPE_NAME).await;
        let indices = self.indices(T::TYPE_NAME)?;
        let entity: &Entity = entity;
        let pk = indices.primary_key(entity)?;

        for (field, registered) in &indices.fields {
            for r in registered {
                let value = indices.value(field, r, entity)?;
                if value.is_empty() {
                    continue;
                }
                debug!(type_name = T::TYPE_NAME, %field, kind = %r.index.kind(), %pk, "index remove");
                r.index.remove(&pk, &value).await?;
            }
        }
        Ok(())
    }

    /// Moves the index entries of an entity from its `from` state to its `to` state.
    ///
    /// Fields whose value did not change are left alone.
    pub async fn update<A: Indexable, B: Indexable>(&self, from: &A, to: &B) -> IndexResult<()> {
        if A::TYPE_NAME != B::TYPE_NAME {
            return Err(IndexError::TypeMismatch {
                from: A::TYPE_NAME.to_string(),
                to: B::TYPE_NAME.to_string(),
            });
        }
        let _guard = self.locks.write(A::TYPE_NAME).await;
        let indices = self.indices(A::TYPE_NAME)?;
        let from: &Entity = from;
        let to: &Entity = to;
        let pk = indices.primary_key(to)?;

        for (field, registered) in &indices.fields {
            for r in registered {
                let old = indices.value(field, r, from)?;
                let new = indices.value(field, r, to)?;
                if old == new {
                    continue;
                }
                debug!(type_name = A::TYPE_NAME, %field, %pk, "index update");
                if old.is_empty() {
                    r.index.add(&pk, &new).await?;
                } else if new.is_empty() {
                    r.index.remove(&pk, &old).await?;
                } else {
                    r.index.update(&pk, &old, &new).await?;
                }
            }
        }
        Ok(())
    }

    /// Evaluates a filter expression against the indexes of `T`.
    ///
    /// Supports `Field eq 'value'`, `startswith(Field, 'prefix')` and `or`.
    /// Every other operator fails with [`IndexError::NotSupported`].
    pub async fn query<T: Indexable>(&self, filter: &str) -> IndexResult<Vec<String>> {
        let tree = query::compile(filter)?;
        let mut found = BTreeSet::new();
        for leaf in tree.leaves() {
            let keys = match leaf {
                QueryLeaf::Eq { field, value } => self.find_by::<T>(&[Field::new(field, value)]).await?,
                QueryLeaf::StartsWith { field, prefix } => {
                    self.find_by_partial::<T>(field, &format!("{}*", index::escape_glob(prefix))).await?
                }
            };
            found.extend(keys);
        }
        Ok(found.into_iter().collect())
    }

    /// Deletes every registered namespace and empties the catalog.
    pub async fn reset(&self) -> IndexResult<()> {
        let types: Vec<Arc<TypeIndices>> = {
            let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
            catalog.drain().map(|(_, indices)| indices).collect()
        };

        for indices in types {
            let _guard = self.locks.write(indices.type_name).await;
            for r in indices.fields.values().flatten() {
                r.index.delete().await?;
            }
            let dir = path::join(&self.config.index_root, &index::encode_segment(indices.type_name));
            match self.storage.delete(&dir).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            info!(type_name = indices.type_name, "indexes reset");
        }
        Ok(())
    }
}
