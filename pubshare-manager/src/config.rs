//! Manager configuration.

use pubshare_crypto::{HashCost, DEFAULT_SIGNATURE_TTL_SECS};
use pubshare_indexer::IndexerConfig;
use serde::{Deserialize, Serialize};

/// Configuration of a [`PublicShareManager`](crate::PublicShareManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Cost of hashing share passwords.
    pub password_hash_cost: HashCost,
    /// How long a share signature stays valid.
    pub signature_ttl_secs: u64,
    /// Storage directory of the share blobs.
    pub share_dir: String,
    /// Name announced to the metadata storage on initialization.
    pub metadata_namespace: String,
    pub indexer: IndexerConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            password_hash_cost: HashCost::default(),
            signature_ttl_secs: DEFAULT_SIGNATURE_TTL_SECS,
            share_dir: "publicshares".to_string(),
            metadata_namespace: "public-share-manager-metadata".to_string(),
            indexer: IndexerConfig::default(),
        }
    }
}
