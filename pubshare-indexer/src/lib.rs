//! Secondary indexes for entities stored in [`MetadataStorage`].
//!
//! An [`Indexer`] keeps, per entity type, a catalog of index primitives keyed
//! by field name. Each primitive maps a normalized field value to the primary
//! keys of the entities carrying it, persisted as pointer records:
//!
//! ```text
//! index/<Type>/unique.<Field>/<value>              -> <entity_dir>/<pk>
//! index/<Type>/non_unique.<Field>/<value>/<pk>     -> <entity_dir>/<pk>
//! index/<Type>/autoincrement.<Field>/<n>           -> <entity_dir>/<pk>
//! ```
//!
//! Field values are extracted with accessor closures supplied at
//! registration, so no runtime reflection is involved.
//!
//! [`Indexer::query`] evaluates a small filter language (`eq`, `startswith`,
//! `or`) against the registered indexes.
//!
//! [`MetadataStorage`]: pubshare_metadata::MetadataStorage

mod config;
mod error;
pub mod index;
mod indexer;
mod lock;
mod option;
pub mod query;

pub use config::IndexerConfig;
pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use indexer::{Field, IndexAddResult, Indexer};
pub use option::{normalize_field_name, Bound, IndexBy, IndexDefinition, IndexKind};
