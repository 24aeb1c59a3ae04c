//! Index definitions.

use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Collision and value-generation policy of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// At most one primary key per value.
    Unique,
    /// Any number of primary keys per value.
    NonUnique,
    /// System-generated increasing numbers; the entity's own value is ignored on add.
    Autoincrement,
}

impl IndexKind {
    /// Returns the kind's name as used in namespaces.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::NonUnique => "non_unique",
            Self::Autoincrement => "autoincrement",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unique" => Ok(Self::Unique),
            "non_unique" => Ok(Self::NonUnique),
            "autoincrement" => Ok(Self::Autoincrement),
            other => Err(IndexError::InvalidIndexType(other.to_string())),
        }
    }
}

/// Range for autoincrement values. An `upper` of zero means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: u64,
    pub upper: u64,
}

impl Bound {
    pub fn new(lower: u64, upper: u64) -> Self {
        Self { lower, upper }
    }

    /// First value handed out by an empty index.
    pub(crate) fn first(&self) -> u64 {
        self.lower.max(1)
    }

    pub(crate) fn exceeded_by(&self, value: u64) -> bool {
        self.upper != 0 && value > self.upper
    }
}

type Accessor<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// How a field value is obtained from an entity.
///
/// [`IndexBy::field`] names a field path (`"Id.OpaqueId"`), [`IndexBy::func`]
/// a derived value. Both names are normalized with [`normalize_field_name`].
pub struct IndexBy<T> {
    name: String,
    get: Accessor<T>,
}

impl<T> Clone for IndexBy<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            get: Arc::clone(&self.get),
        }
    }
}

impl<T> fmt::Debug for IndexBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexBy").field("name", &self.name).finish()
    }
}

impl<T> IndexBy<T> {
    /// A plain field, read through `get`.
    pub fn field(path: &str, get: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        Self {
            name: normalize_field_name(path),
            get: Arc::new(get),
        }
    }

    /// A computed value, such as two ids joined into one key.
    pub fn func(name: &str, func: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        Self {
            name: normalize_field_name(name),
            get: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self, entity: &T) -> String {
        (self.get)(entity)
    }
}

/// Everything needed to register one index for entity type `T`.
pub struct IndexDefinition<T> {
    pub(crate) kind: IndexKind,
    pub(crate) primary_key: IndexBy<T>,
    pub(crate) by: IndexBy<T>,
    pub(crate) case_insensitive: bool,
    pub(crate) bound: Bound,
    pub(crate) entity_dir: String,
}

impl<T> fmt::Debug for IndexDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("kind", &self.kind)
            .field("primary_key", &self.primary_key)
            .field("by", &self.by)
            .field("case_insensitive", &self.case_insensitive)
            .field("bound", &self.bound)
            .field("entity_dir", &self.entity_dir)
            .finish()
    }
}

impl<T> IndexDefinition<T> {
    pub fn new(kind: IndexKind, primary_key: IndexBy<T>, by: IndexBy<T>) -> Self {
        Self {
            kind,
            primary_key,
            by,
            case_insensitive: false,
            bound: Bound::default(),
            entity_dir: String::new(),
        }
    }

    pub fn unique(primary_key: IndexBy<T>, by: IndexBy<T>) -> Self {
        Self::new(IndexKind::Unique, primary_key, by)
    }

    pub fn non_unique(primary_key: IndexBy<T>, by: IndexBy<T>) -> Self {
        Self::new(IndexKind::NonUnique, primary_key, by)
    }

    pub fn autoincrement(primary_key: IndexBy<T>, by: IndexBy<T>) -> Self {
        Self::new(IndexKind::Autoincrement, primary_key, by)
    }

    /// Lowercases values before storing and looking them up.
    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Limits the numbers an autoincrement index hands out.
    pub fn bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    /// Storage directory holding the entities; entries point at `<entity_dir>/<pk>`.
    pub fn entity_dir(mut self, dir: impl Into<String>) -> Self {
        self.entity_dir = dir.into();
        self
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn field_name(&self) -> &str {
        self.by.name()
    }
}

/// Converts an external field path into the catalog's casing.
///
/// Segments may be separated by `.` or `/`; each segment is converted to
/// upper camel case (`"id/opaque_id"` becomes `"Id.OpaqueId"`).
pub fn normalize_field_name(path: &str) -> String {
    path.split(['.', '/'])
        .filter(|s| !s.is_empty())
        .map(to_camel)
        .collect::<Vec<_>>()
        .join(".")
}

fn to_camel(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for word in segment.split(['_', '-', ' ']).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
