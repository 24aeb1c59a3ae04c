/// An entity that can be held in secondary indexes.
///
/// The type name keys the index catalog, the per-type lock and the storage
/// namespace of every index registered for the type. Two Rust types that
/// report the same name are treated as the same entity type.
pub trait Indexable: Send + Sync + 'static {
    /// Stable identifier of the entity type.
    const TYPE_NAME: &'static str;
}
