//! Indexer configuration.

use serde::{Deserialize, Serialize};

/// Where the indexer keeps its namespaces inside the metadata storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Directory holding one sub-directory per entity type.
    pub index_root: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            index_root: "index".to_string(),
        }
    }
}
