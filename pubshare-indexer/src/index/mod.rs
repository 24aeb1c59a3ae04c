//! Index primitives.
//!
//! Every primitive owns one namespace directory in the metadata storage and
//! records entries as pointers to `<entity_dir>/<pk>`. The kinds differ only
//! in collision and value-generation policy.

mod autoincrement;
mod non_unique;
mod unique;

pub use autoincrement::AutoincrementIndex;
pub use non_unique::NonUniqueIndex;
pub use unique::UniqueIndex;

use crate::error::IndexResult;
use crate::option::{Bound, IndexKind};
use async_trait::async_trait;
use pubshare_metadata::{path, MetadataStorage};
use std::sync::Arc;

/// One concrete mapping from normalized field values to primary keys.
#[async_trait]
pub trait Index: Send + Sync {
    /// Creates the namespace directory.
    async fn init(&self) -> IndexResult<()>;

    /// Records `(value, pk)`. Returns the stored value for unique and
    /// autoincrement indexes.
    async fn add(&self, pk: &str, value: &str) -> IndexResult<Option<String>>;

    /// Returns the primary keys stored under any of `values`. Unknown values
    /// contribute nothing.
    async fn lookup(&self, values: &[String]) -> IndexResult<Vec<String>>;

    /// Deletes the `(value, pk)` entry. Missing entries are ignored.
    async fn remove(&self, pk: &str, value: &str) -> IndexResult<()>;

    /// Moves the entry for `pk` from `old` to `new`.
    async fn update(&self, pk: &str, old: &str, new: &str) -> IndexResult<()>;

    /// Returns the primary keys of every value matching the glob `pattern`
    /// (`*` and `?` wildcards).
    async fn search(&self, pattern: &str) -> IndexResult<Vec<String>>;

    /// Deletes the whole namespace.
    async fn delete(&self) -> IndexResult<()>;

    fn kind(&self) -> IndexKind;

    /// The normalized field name this index covers.
    fn field(&self) -> &str;

    /// Storage directory of the entries.
    fn namespace(&self) -> &str;
}

/// Settings shared by every index kind.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub type_name: String,
    pub field: String,
    pub namespace: String,
    pub entity_dir: String,
    pub case_insensitive: bool,
    pub bound: Bound,
}

impl IndexOptions {
    /// Namespace `<index_root>/<type_name>/<kind>.<field>`.
    pub fn new(index_root: &str, type_name: &str, field: &str, kind: IndexKind) -> Self {
        let dir = path::join(index_root, &encode_segment(type_name));
        let namespace = path::join(&dir, &encode_segment(&format!("{kind}.{field}")));
        Self {
            type_name: type_name.to_string(),
            field: field.to_string(),
            namespace,
            entity_dir: String::new(),
            case_insensitive: false,
            bound: Bound::default(),
        }
    }

    /// Applies case folding to a value.
    pub(crate) fn normalize<'a>(&self, value: &'a str) -> std::borrow::Cow<'a, str> {
        if self.case_insensitive {
            value.to_lowercase().into()
        } else {
            value.into()
        }
    }

    /// Storage path of the entry (or entry directory) for `value`.
    pub(crate) fn value_path(&self, value: &str) -> String {
        path::join(&self.namespace, &encode_segment(&self.normalize(value)))
    }

    /// Pointer target recorded for `pk`.
    pub(crate) fn target(&self, pk: &str) -> String {
        path::join(&self.entity_dir, &encode_segment(pk))
    }
}

/// Builds the primitive for `kind`.
pub fn build(kind: IndexKind, storage: Arc<dyn MetadataStorage>, options: IndexOptions) -> Arc<dyn Index> {
    match kind {
        IndexKind::Unique => Arc::new(UniqueIndex::new(storage, options)),
        IndexKind::NonUnique => Arc::new(NonUniqueIndex::new(storage, options)),
        IndexKind::Autoincrement => Arc::new(AutoincrementIndex::new(storage, options)),
    }
}

/// Escapes a value into a single path segment.
///
/// A leading `.` is escaped as well, so encoded values never collide with
/// `.`/`..` or with the dot-prefixed bookkeeping files of a namespace.
pub(crate) fn encode_segment(value: &str) -> String {
    let encoded = urlencoding::encode(value);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{rest}"),
        None => encoded.into_owned(),
    }
}

pub(crate) fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Returns the primary key a pointer target refers to.
pub(crate) fn pk_from_target(target: &str) -> String {
    decode_segment(path::base(target))
}

/// Returns true for namespace entries that hold values, false for bookkeeping files.
pub(crate) fn is_value_entry(name: &str) -> bool {
    !name.starts_with('.')
}

#[derive(Clone, Copy, PartialEq)]
enum GlobToken {
    Star,
    One,
    Lit(char),
}

fn glob_tokens(pattern: &str) -> Vec<GlobToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => GlobToken::Star,
            '?' => GlobToken::One,
            // a trailing backslash matches itself
            '\\' => GlobToken::Lit(chars.next().unwrap_or('\\')),
            c => GlobToken::Lit(c),
        });
    }
    tokens
}

/// Matches `text` against a glob with `*` (any run) and `?` (any one char).
///
/// A backslash makes the next character literal.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p = glob_tokens(pattern);
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        let step = match p.get(pi) {
            Some(GlobToken::One) => true,
            Some(GlobToken::Lit(c)) => *c == t[ti],
            _ => false,
        };
        if step {
            pi += 1;
            ti += 1;
        } else if p.get(pi) == Some(&GlobToken::Star) {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&tok| tok == GlobToken::Star)
}

/// Escapes glob metacharacters so `value` only matches itself.
pub(crate) fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
