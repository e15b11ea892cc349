// Indexer module
// Keeps the durable chunk store and the in-memory shards in step

pub mod consistency;


use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, SearchConfig};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{Chunk, Namespace, NewChunk};
use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::profile::{TextField, extract_text_fields};
use crate::embeddings::{Embedder, embedder_from_config};
use crate::index::{ShardIndex, ShardKey, ShardRegistry};
use crate::vector::Vector;
use crate::{IndexError, Result};

pub use consistency::{ConsistencyReport, ConsistencyValidator, ShardConsistencyIssue};

/// `source_type` recorded on every section chunk
pub const SECTION_SOURCE_TYPE: &str = "user_edited";

/// A ranked chunk hydrated from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub score: f32,
    pub user_id: String,
    pub namespace: Namespace,
    pub section_id: Option<String>,
    pub source_type: String,
    pub source_id: String,
    pub text: String,
    pub created_at: NaiveDateTime,
}

impl SearchResult {
    #[inline]
    fn from_chunk(chunk: Chunk, score: f32) -> Self {
        Self {
            chunk_id: chunk.chunk_id,
            score,
            user_id: chunk.user_id,
            namespace: chunk.namespace,
            section_id: chunk.section_id,
            source_type: chunk.source_type,
            source_id: chunk.source_id,
            text: chunk.text,
            created_at: chunk.created_at,
        }
    }
}

/// Outcome of the startup rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    pub shards: usize,
    pub chunks: usize,
}

/// Stored rows next to indexed vectors for one shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStatus {
    pub key: ShardKey,
    pub stored_chunks: usize,
    pub indexed_chunks: usize,
}

impl ShardStatus {
    #[inline]
    pub fn is_in_sync(&self) -> bool {
        self.stored_chunks == self.indexed_chunks
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub dimension: usize,
    pub shards: Vec<ShardStatus>,
}

impl IndexStatus {
    #[inline]
    pub fn total_stored(&self) -> usize {
        self.shards.iter().map(|s| s.stored_chunks).sum()
    }

    #[inline]
    pub fn total_indexed(&self) -> usize {
        self.shards.iter().map(|s| s.indexed_chunks).sum()
    }
}

/// Orchestrates the chunk store, the shard registry and the embedder.
///
/// Every write goes to the store first; shards are only touched after the
/// store write has committed.
pub struct IndexManager {
    database: Database,
    registry: Arc<ShardRegistry>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    search: SearchConfig,
}

impl std::fmt::Debug for IndexManager {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("dimension", &self.embedder.dimension())
            .field("shards", &self.registry.len())
            .field("chunking", &self.chunking)
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

impl IndexManager {
    /// Manager with a fresh, empty registry sized for the embedder
    #[inline]
    pub fn new(database: Database, embedder: Arc<dyn Embedder>, config: &Config) -> Self {
        let registry = Arc::new(ShardRegistry::new(embedder.dimension()));
        Self {
            database,
            registry,
            embedder,
            chunking: config.chunking.clone(),
            search: config.search.clone(),
        }
    }

    /// Manager sharing an existing registry
    #[inline]
    pub fn with_registry(
        database: Database,
        embedder: Arc<dyn Embedder>,
        registry: Arc<ShardRegistry>,
        config: &Config,
    ) -> Result<Self> {
        if registry.dimension() != embedder.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: embedder.dimension(),
                actual: registry.dimension(),
            });
        }

        Ok(Self {
            database,
            registry,
            embedder,
            chunking: config.chunking.clone(),
            search: config.search.clone(),
        })
    }

    /// Open the store under the config directory and build the configured embedder
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| IndexError::Config(e.to_string()))?;

        let database = Database::initialize_from_config_dir(config.get_base_dir()).await?;
        let embedder = embedder_from_config(&config.embedding)?;
        Ok(Self::new(database, embedder, config))
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ShardRegistry> {
        &self.registry
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Startup hook: rebuild every shard from the store, replacing the registry contents
    #[inline]
    pub async fn rebuild_all(&self) -> Result<RebuildSummary> {
        info!("Rebuilding all shards from the chunk store");

        let chunks = self.database.list_all().await?;
        let total = chunks.len();
        let dimension = self.dimension();

        let mut indexes = HashMap::new();
        for (key, shard_chunks) in chunks
            .into_iter()
            .into_group_map_by(|chunk| ShardKey::new(chunk.user_id.clone(), chunk.namespace))
        {
            let entries = shard_chunks
                .into_iter()
                .map(|chunk| (chunk.chunk_id, chunk.embedding));
            indexes.insert(key, ShardIndex::from_entries(dimension, entries)?);
        }

        let summary = RebuildSummary {
            shards: indexes.len(),
            chunks: total,
        };
        self.registry.replace_all(indexes);

        info!(
            "Rebuilt {} shards holding {} chunks",
            summary.shards, summary.chunks
        );
        Ok(summary)
    }

    /// Destructively replace a user's profile namespace with `fields`.
    /// Returns the number of chunks written.
    #[inline]
    pub async fn reindex_profile(&self, user_id: &str, fields: &[TextField]) -> Result<usize> {
        require_id("user_id", user_id)?;

        let pieces: Vec<(&TextField, String)> = fields
            .iter()
            .flat_map(|field| {
                self.chunking
                    .chunk(&field.text)
                    .into_iter()
                    .map(move |text| (field, text))
            })
            .collect();

        debug!(
            "Reindexing profile for {}: {} fields, {} chunks",
            user_id,
            fields.len(),
            pieces.len()
        );

        let texts = pieces.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = self.embed_texts(texts).await?;

        let new_chunks: Vec<NewChunk> = pieces
            .into_iter()
            .zip(embeddings)
            .map(|((field, text), embedding)| {
                NewChunk::new(
                    user_id,
                    Namespace::Profile,
                    field.source_type.as_str(),
                    field.source_id.as_str(),
                    text,
                    embedding,
                )
            })
            .collect();

        let key = ShardKey::new(user_id, Namespace::Profile);
        let index = ShardIndex::from_entries(self.dimension(), shard_entries(&new_chunks))?;

        // Commit and swap as one step against other writers of this shard
        let gate = self.registry.write_gate(&key);
        let guard = gate.lock().await;

        let (removed, inserted) = self
            .database
            .replace_shard(user_id, Namespace::Profile, &new_chunks)
            .await?;

        if index.is_empty() {
            self.registry.remove(&key);
        } else {
            self.registry.replace(&key, index);
        }
        drop(guard);

        self.database.upsert_user_marker(user_id).await?;

        info!(
            "Reindexed profile for {}: removed {}, inserted {}",
            user_id, removed, inserted
        );
        Ok(inserted)
    }

    /// Extract the indexable fields of a profile document, then `reindex_profile`
    #[inline]
    pub async fn reindex_profile_json(&self, user_id: &str, profile: &Value) -> Result<usize> {
        let fields = extract_text_fields(profile);
        if fields.is_empty() {
            warn!("Profile for {} has no indexable text", user_id);
        }
        self.reindex_profile(user_id, &fields).await
    }

    /// Replace the stored version of a section and rebuild the user's section shard.
    /// Returns the ids of the new chunks in order.
    #[inline]
    pub async fn index_section(
        &self,
        user_id: &str,
        section_id: &str,
        text: &str,
    ) -> Result<Vec<String>> {
        require_id("user_id", user_id)?;
        require_id("section_id", section_id)?;

        let texts = self.chunking.chunk(text);
        let embeddings = self.embed_texts(texts.clone()).await?;

        let new_chunks: Vec<NewChunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (text, embedding))| {
                NewChunk::new(
                    user_id,
                    Namespace::EditedSection,
                    SECTION_SOURCE_TYPE,
                    position.to_string(),
                    text,
                    embedding,
                )
                .with_section(section_id)
            })
            .collect();

        let (removed, inserted) = self
            .database
            .replace_section(user_id, section_id, &new_chunks)
            .await?;

        self.rebuild_shard(&ShardKey::new(user_id, Namespace::EditedSection))
            .await?;

        info!(
            "Indexed section {} for {}: removed {}, inserted {}",
            section_id, user_id, removed, inserted
        );
        Ok(new_chunks.into_iter().map(|c| c.chunk_id).collect())
    }

    /// Remove a section in every namespace. Returns the number of rows removed.
    #[inline]
    pub async fn delete_section(&self, user_id: &str, section_id: &str) -> Result<u64> {
        require_id("user_id", user_id)?;
        require_id("section_id", section_id)?;

        let removed = self.database.delete_by_section(user_id, section_id).await?;

        if removed > 0 {
            self.rebuild_shard(&ShardKey::new(user_id, Namespace::EditedSection))
                .await?;
            info!(
                "Deleted section {} for {}: {} chunks",
                section_id, user_id, removed
            );
        } else {
            debug!("Section {} for {} had no chunks", section_id, user_id);
        }

        Ok(removed)
    }

    /// Rank a shard against `query` and hydrate the hits from the store.
    ///
    /// Hits whose row has vanished are dropped. With a non-empty
    /// `section_filter`, only chunks carrying one of the listed section ids are
    /// kept; an empty filter is the same as none. Filtering never re-ranks.
    #[inline]
    pub async fn search(
        &self,
        user_id: &str,
        namespace: Namespace,
        query: Vec<f32>,
        top_k: usize,
        section_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        require_id("user_id", user_id)?;
        self.check_top_k(top_k)?;

        let query = Vector::new(query, self.dimension())?.normalized();
        let key = ShardKey::new(user_id, namespace);
        let hits = self.registry.search(&key, &query, top_k)?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(chunk) = self.database.get(&hit.chunk_id).await? else {
                warn!("Dropping hit {} in {}: row no longer stored", hit.chunk_id, key);
                continue;
            };

            if let Some(filter) = section_filter.filter(|f| !f.is_empty()) {
                let in_filter = chunk
                    .section_id
                    .as_ref()
                    .is_some_and(|section| filter.contains(section));
                if !in_filter {
                    continue;
                }
            }

            results.push(SearchResult::from_chunk(chunk, hit.score));
        }

        debug!("Search in {} returned {} results", key, results.len());
        Ok(results)
    }

    /// Embed `query` and `search` with it
    #[inline]
    pub async fn search_text(
        &self,
        user_id: &str,
        namespace: Namespace,
        query: &str,
        top_k: usize,
        section_filter: Option<&[String]>,
    ) -> Result<Vec<SearchResult>> {
        self.check_top_k(top_k)?;
        let query_vector = self.embed(query).await?;
        self.search(
            user_id,
            namespace,
            query_vector.into_inner(),
            top_k,
            section_filter,
        )
        .await
    }

    /// Unit-normalized embedding of `text`
    #[inline]
    pub async fn embed(&self, text: &str) -> Result<Vector> {
        self.embed_texts(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| IndexError::Embedding("Embedder returned no vector".to_string()))
    }

    /// Stored row counts next to in-memory shard sizes
    #[inline]
    pub async fn status(&self) -> Result<IndexStatus> {
        let mut shards: BTreeMap<ShardKey, ShardStatus> = BTreeMap::new();

        for count in self.database.shard_counts().await? {
            let key = ShardKey::new(count.user_id, count.namespace);
            shards.insert(
                key.clone(),
                ShardStatus {
                    key,
                    stored_chunks: usize::try_from(count.count).unwrap_or_default(),
                    indexed_chunks: 0,
                },
            );
        }

        for stats in self.registry.stats() {
            shards
                .entry(stats.key.clone())
                .or_insert_with(|| ShardStatus {
                    key: stats.key.clone(),
                    stored_chunks: 0,
                    indexed_chunks: 0,
                })
                .indexed_chunks = stats.len;
        }

        Ok(IndexStatus {
            dimension: self.dimension(),
            shards: shards.into_values().collect(),
        })
    }

    /// Compare the store against the in-memory shards
    #[inline]
    pub async fn check_consistency(&self) -> Result<ConsistencyReport> {
        ConsistencyValidator::new(&self.database, &self.registry)
            .validate_consistency()
            .await
    }

    /// Rebuild every shard named in `report`. Returns the number of shards rebuilt.
    #[inline]
    pub async fn repair(&self, report: &ConsistencyReport) -> Result<usize> {
        ConsistencyValidator::new(&self.database, &self.registry)
            .repair(report)
            .await
    }

    /// Reload one shard from the store; an empty result discards the shard
    #[inline]
    pub async fn rebuild_shard(&self, key: &ShardKey) -> Result<usize> {
        rebuild_shard_from_store(&self.database, &self.registry, key).await
    }

    fn check_top_k(&self, top_k: usize) -> Result<()> {
        if top_k == 0 || top_k > self.search.max_top_k {
            return Err(IndexError::InvalidRequest(format!(
                "top_k must be between 1 and {}, got {}",
                self.search.max_top_k, top_k
            )));
        }
        Ok(())
    }

    /// Embed off the async runtime, then check and normalize every vector
    async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let embedder = Arc::clone(&self.embedder);
        let raw = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| IndexError::Embedding(format!("Embedding task failed: {e}")))??;

        if raw.len() != expected {
            return Err(IndexError::Embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                raw.len()
            )));
        }

        let dimension = self.dimension();
        raw.into_iter()
            .map(|values| Vector::new(values, dimension).map(Vector::normalized))
            .collect()
    }
}

/// Snapshot a shard's rows from the store and swap a freshly built index in
pub(crate) async fn rebuild_shard_from_store(
    database: &Database,
    registry: &ShardRegistry,
    key: &ShardKey,
) -> Result<usize> {
    let gate = registry.write_gate(key);
    let _guard = gate.lock().await;

    let chunks = database.list_by_shard(&key.user_id, key.namespace).await?;

    if chunks.is_empty() {
        registry.remove(key);
        debug!("Discarded empty shard {}", key);
        return Ok(0);
    }

    let index = ShardIndex::from_entries(
        registry.dimension(),
        chunks
            .into_iter()
            .map(|chunk| (chunk.chunk_id, chunk.embedding)),
    )?;
    let len = index.len();
    registry.replace(key, index);

    debug!("Rebuilt shard {} with {} chunks", key, len);
    Ok(len)
}

fn shard_entries(chunks: &[NewChunk]) -> impl Iterator<Item = (String, Vector)> + '_ {
    chunks
        .iter()
        .map(|chunk| (chunk.chunk_id.clone(), chunk.embedding.clone()))
}

fn require_id(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IndexError::InvalidRequest(format!("{name} must not be empty")));
    }
    Ok(())
}
