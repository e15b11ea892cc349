// In-memory exact vector index
// One shard per (user, namespace) pair, held in an injectable registry

pub mod registry;
pub mod shard;

use serde::{Deserialize, Serialize};

use crate::database::models::Namespace;

pub use registry::{ShardRegistry, ShardStats, SharedShard};
pub use shard::{ScoredChunk, ShardIndex};

/// Identifies one shard
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardKey {
    pub user_id: String,
    pub namespace: Namespace,
}

impl ShardKey {
    #[inline]
    pub fn new(user_id: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            user_id: user_id.into(),
            namespace,
        }
    }
}

impl std::fmt::Display for ShardKey {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.namespace)
    }
}
