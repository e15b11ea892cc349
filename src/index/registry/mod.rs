
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::ShardKey;
use super::shard::{ScoredChunk, ShardIndex};
use crate::Result;
use crate::vector::Vector;

pub type SharedShard = Arc<RwLock<ShardIndex>>;

/// Serializes the writers of one shard; readers never take it
pub type WriteGate = Arc<AsyncMutex<()>>;

/// Size of one in-memory shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStats {
    pub key: ShardKey,
    pub len: usize,
}

/// Map from shard key to shard, each shard behind its own lock.
///
/// The map mutex is held only to look up or insert entries. Shard-level
/// calls take the shard's `RwLock`, so searches on one shard never wait on
/// writes to another. Rebuilt indexes are constructed by the caller and
/// swapped in under the write lock: readers observe either the old or the new
/// content, never a mix.
///
/// Writers of the same shard additionally hold its write gate from the store
/// write (or snapshot) through the swap, so an older snapshot can never
/// replace a newer one. Gates outlive `remove` and `clear`.
#[derive(Debug)]
pub struct ShardRegistry {
    dimension: usize,
    shards: Mutex<HashMap<ShardKey, SharedShard>>,
    gates: Mutex<HashMap<ShardKey, WriteGate>>,
}

impl ShardRegistry {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            shards: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn get(&self, key: &ShardKey) -> Option<SharedShard> {
        self.shards.lock().get(key).cloned()
    }

    /// The shard for `key`, created empty if absent
    #[inline]
    pub fn get_or_create(&self, key: &ShardKey) -> SharedShard {
        let dimension = self.dimension;
        self.shards
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::new(ShardIndex::new(dimension))))
            .clone()
    }

    /// The write gate for `key`, created on first use
    #[inline]
    pub fn write_gate(&self, key: &ShardKey) -> WriteGate {
        Arc::clone(self.gates.lock().entry(key.clone()).or_default())
    }

    /// Swap in a fully built index for `key`
    #[inline]
    pub fn replace(&self, key: &ShardKey, index: ShardIndex) {
        debug!("Replacing shard {} with {} vectors", key, index.len());
        let shard = self.get_or_create(key);
        *shard.write() = index;
    }

    /// Append one vector to the shard for `key`, returning its ordinal
    #[inline]
    pub fn append(&self, key: &ShardKey, chunk_id: impl Into<String>, vector: Vector) -> Result<usize> {
        let shard = self.get_or_create(key);
        let mut guard = shard.write();
        guard.append(chunk_id, vector)
    }

    /// Discard the shard for `key`. Returns whether one existed.
    #[inline]
    pub fn remove(&self, key: &ShardKey) -> bool {
        self.shards.lock().remove(key).is_some()
    }

    #[inline]
    pub fn clear(&self) {
        self.shards.lock().clear();
    }

    /// Replace the whole map at once
    #[inline]
    pub fn replace_all(&self, indexes: HashMap<ShardKey, ShardIndex>) {
        let shards = indexes
            .into_iter()
            .map(|(key, index)| (key, Arc::new(RwLock::new(index))))
            .collect();
        *self.shards.lock() = shards;
    }

    /// All shard keys, sorted
    #[inline]
    pub fn keys(&self) -> Vec<ShardKey> {
        let mut keys: Vec<ShardKey> = self.shards.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shards.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shards.lock().is_empty()
    }

    /// Search one shard; a missing shard yields no results
    #[inline]
    pub fn search(&self, key: &ShardKey, query: &Vector, k: usize) -> Result<Vec<ScoredChunk>> {
        match self.get(key) {
            Some(shard) => shard.read().search(query, k),
            None => {
                // Still reject a malformed query
                ShardIndex::new(self.dimension).search(query, k)
            }
        }
    }

    /// Chunk ids of one shard in ordinal order
    #[inline]
    pub fn chunk_ids(&self, key: &ShardKey) -> Vec<String> {
        self.get(key)
            .map(|shard| shard.read().chunk_ids().to_vec())
            .unwrap_or_default()
    }

    /// Per-shard sizes, sorted by key
    #[inline]
    pub fn stats(&self) -> Vec<ShardStats> {
        let shards: Vec<(ShardKey, SharedShard)> = self
            .shards
            .lock()
            .iter()
            .map(|(key, shard)| (key.clone(), Arc::clone(shard)))
            .collect();

        let mut stats: Vec<ShardStats> = shards
            .into_iter()
            .map(|(key, shard)| {
                let len = shard.read().len();
                ShardStats { key, len }
            })
            .collect();
        stats.sort_by(|a, b| a.key.cmp(&b.key));
        stats
    }
}
