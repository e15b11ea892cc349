// Store/index consistency validation
// Compares the SQLite chunk store with the in-memory shards and repairs drift

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

use super::rebuild_shard_from_store;
use crate::Result;
use crate::database::sqlite::Database;
use crate::index::{ShardKey, ShardRegistry};

/// Consistency check results between the chunk store and the shard registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Number of chunk rows in the store
    pub stored_chunks: usize,
    /// Number of vectors held by all shards
    pub indexed_chunks: usize,
    /// Chunk ids that exist in the store but in no shard
    pub missing_in_index: Vec<String>,
    /// Chunk ids held by a shard with no store row
    pub orphaned_in_index: Vec<String>,
    /// Shards with consistency issues
    pub inconsistent_shards: Vec<ShardConsistencyIssue>,
    /// Overall consistency status
    pub is_consistent: bool,
}

/// Consistency issue for a specific shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardConsistencyIssue {
    pub key: ShardKey,
    pub stored_chunks: usize,
    pub indexed_chunks: usize,
    pub missing_in_index: Vec<String>,
    pub orphaned_in_index: Vec<String>,
}

/// Performs consistency validation between the store and the registry
pub struct ConsistencyValidator<'a> {
    database: &'a Database,
    registry: &'a ShardRegistry,
}

impl<'a> ConsistencyValidator<'a> {
    #[inline]
    pub fn new(database: &'a Database, registry: &'a ShardRegistry) -> Self {
        Self { database, registry }
    }

    /// Perform a full consistency check, shard by shard
    #[inline]
    pub async fn validate_consistency(&self) -> Result<ConsistencyReport> {
        info!("Starting store/index consistency validation");

        let mut stored: BTreeMap<ShardKey, Vec<String>> = BTreeMap::new();
        for chunk in self.database.list_all().await? {
            stored
                .entry(ShardKey::new(chunk.user_id, chunk.namespace))
                .or_default()
                .push(chunk.chunk_id);
        }

        let mut indexed: BTreeMap<ShardKey, Vec<String>> = BTreeMap::new();
        for key in self.registry.keys() {
            let ids = self.registry.chunk_ids(&key);
            indexed.insert(key, ids);
        }

        let stored_chunks = stored.values().map(Vec::len).sum();
        let indexed_chunks = indexed.values().map(Vec::len).sum();
        debug!(
            "Found {} stored chunks and {} indexed vectors",
            stored_chunks, indexed_chunks
        );

        let keys: BTreeSet<&ShardKey> = stored.keys().chain(indexed.keys()).collect();
        let mut inconsistent_shards = Vec::new();

        for key in keys {
            let store_ids = stored.get(key).map(Vec::as_slice).unwrap_or_default();
            let index_ids = indexed.get(key).map(Vec::as_slice).unwrap_or_default();

            if let Some(issue) = compare_shard(key, store_ids, index_ids) {
                inconsistent_shards.push(issue);
            }
        }

        let missing_in_index: Vec<String> = inconsistent_shards
            .iter()
            .flat_map(|issue| issue.missing_in_index.iter().cloned())
            .collect();
        let orphaned_in_index: Vec<String> = inconsistent_shards
            .iter()
            .flat_map(|issue| issue.orphaned_in_index.iter().cloned())
            .collect();

        let report = ConsistencyReport {
            stored_chunks,
            indexed_chunks,
            is_consistent: inconsistent_shards.is_empty(),
            missing_in_index,
            orphaned_in_index,
            inconsistent_shards,
        };

        if report.is_consistent {
            info!("Store/index consistency validation passed");
        } else {
            warn!("Store/index consistency validation found issues");
            log_consistency_issues(&report);
        }

        Ok(report)
    }

    /// Rebuild every inconsistent shard from the store.
    /// Returns the number of shards rebuilt or discarded.
    #[inline]
    pub async fn repair(&self, report: &ConsistencyReport) -> Result<usize> {
        if report.is_consistent {
            info!("Index is consistent, no repair needed");
            return Ok(0);
        }

        let mut repaired = 0;
        for issue in &report.inconsistent_shards {
            let len = rebuild_shard_from_store(self.database, self.registry, &issue.key).await?;
            debug!("Repaired shard {} ({} chunks)", issue.key, len);
            repaired += 1;
        }

        info!("Repaired {} shards", repaired);
        Ok(repaired)
    }
}

// A shard is consistent when it holds exactly the stored ids in store order
fn compare_shard(
    key: &ShardKey,
    store_ids: &[String],
    index_ids: &[String],
) -> Option<ShardConsistencyIssue> {
    if store_ids == index_ids {
        return None;
    }

    let store_set: HashSet<&String> = store_ids.iter().collect();
    let index_set: HashSet<&String> = index_ids.iter().collect();

    let missing_in_index = store_ids
        .iter()
        .filter(|id| !index_set.contains(id))
        .cloned()
        .collect();
    let orphaned_in_index = index_ids
        .iter()
        .filter(|id| !store_set.contains(id))
        .cloned()
        .collect();

    Some(ShardConsistencyIssue {
        key: key.clone(),
        stored_chunks: store_ids.len(),
        indexed_chunks: index_ids.len(),
        missing_in_index,
        orphaned_in_index,
    })
}

fn log_consistency_issues(report: &ConsistencyReport) {
    if !report.missing_in_index.is_empty() {
        warn!(
            "Found {} stored chunks missing from the index",
            report.missing_in_index.len()
        );
    }

    if !report.orphaned_in_index.is_empty() {
        warn!(
            "Found {} orphaned vectors in the index",
            report.orphaned_in_index.len()
        );
    }

    for issue in &report.inconsistent_shards {
        warn!(
            "Shard {} has consistency issues: {} stored chunks, {} indexed vectors",
            issue.key, issue.stored_chunks, issue.indexed_chunks
        );
    }
}

impl ConsistencyReport {
    /// Get a human-readable summary of the consistency report
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "Index is consistent: {} chunks stored, {} vectors indexed",
                self.stored_chunks, self.indexed_chunks
            )
        } else {
            format!(
                "Index inconsistencies found: {} missing from index, {} orphaned in index, {} shards with issues",
                self.missing_in_index.len(),
                self.orphaned_in_index.len(),
                self.inconsistent_shards.len()
            )
        }
    }

    /// Get the total number of consistency issues
    #[inline]
    pub fn total_issues(&self) -> usize {
        self.missing_in_index.len() + self.orphaned_in_index.len()
    }
}
