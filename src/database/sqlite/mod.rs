use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{Chunk, NewChunk, Namespace, ShardCount, UserMarker};
use crate::database::sqlite::queries::{ChunkQueries, UserQueries};
use crate::{IndexError, Result};


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// File name of the store inside the config directory
pub const DATABASE_FILE_NAME: &str = "chunks.db";

/// Durable chunk store. Single source of truth for chunk rows and user markers.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| IndexError::StoreUnavailable(format!("Failed to run migrations: {e}")))?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir)?;
        Self::new(config_dir.join(DATABASE_FILE_NAME)).await
    }

    /// Persist one chunk; fails with `DuplicateId` if its id is taken
    #[inline]
    pub async fn insert(&self, chunk: NewChunk) -> Result<Chunk> {
        let created_at = Utc::now().naive_utc();
        let mut conn = self.pool.acquire().await?;
        ChunkQueries::insert(&mut conn, &chunk, created_at).await?;
        Ok(chunk.into_chunk(created_at))
    }

    #[inline]
    pub async fn get(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        ChunkQueries::get(&self.pool, chunk_id).await
    }

    #[inline]
    pub async fn list_all(&self) -> Result<Vec<Chunk>> {
        ChunkQueries::list_all(&self.pool).await
    }

    #[inline]
    pub async fn list_by_shard(&self, user_id: &str, namespace: Namespace) -> Result<Vec<Chunk>> {
        ChunkQueries::list_by_shard(&self.pool, user_id, namespace).await
    }

    #[inline]
    pub async fn delete_by_shard(&self, user_id: &str, namespace: Namespace) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        ChunkQueries::delete_by_shard(&mut conn, user_id, namespace).await
    }

    #[inline]
    pub async fn delete_by_section(&self, user_id: &str, section_id: &str) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        ChunkQueries::delete_by_section(&mut conn, user_id, section_id).await
    }

    /// Atomically swap a shard's rows for `chunks`. Returns (removed, inserted).
    ///
    /// Every chunk must belong to the given shard. On any failure the
    /// transaction rolls back and the previous rows stay in place.
    #[inline]
    pub async fn replace_shard(
        &self,
        user_id: &str,
        namespace: Namespace,
        chunks: &[NewChunk],
    ) -> Result<(u64, usize)> {
        if let Some(stray) = chunks
            .iter()
            .find(|c| c.user_id != user_id || c.namespace != namespace)
        {
            return Err(IndexError::InvalidRequest(format!(
                "Chunk {} does not belong to shard {}/{}",
                stray.chunk_id, user_id, namespace
            )));
        }

        let created_at = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        let removed = ChunkQueries::delete_by_shard(&mut tx, user_id, namespace).await?;
        for chunk in chunks {
            ChunkQueries::insert(&mut tx, chunk, created_at).await?;
        }

        tx.commit().await?;

        debug!(
            "Replaced shard {}/{}: removed {}, inserted {}",
            user_id,
            namespace,
            removed,
            chunks.len()
        );
        Ok((removed, chunks.len()))
    }

    /// Atomically swap every stored version of a section for `chunks`.
    /// Returns (removed, inserted).
    #[inline]
    pub async fn replace_section(
        &self,
        user_id: &str,
        section_id: &str,
        chunks: &[NewChunk],
    ) -> Result<(u64, usize)> {
        if let Some(stray) = chunks
            .iter()
            .find(|c| c.user_id != user_id || c.section_id.as_deref() != Some(section_id))
        {
            return Err(IndexError::InvalidRequest(format!(
                "Chunk {} does not belong to section {}/{}",
                stray.chunk_id, user_id, section_id
            )));
        }

        let created_at = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        let removed = ChunkQueries::delete_by_section(&mut tx, user_id, section_id).await?;
        for chunk in chunks {
            ChunkQueries::insert(&mut tx, chunk, created_at).await?;
        }

        tx.commit().await?;

        debug!(
            "Replaced section {}/{}: removed {}, inserted {}",
            user_id,
            section_id,
            removed,
            chunks.len()
        );
        Ok((removed, chunks.len()))
    }

    #[inline]
    pub async fn upsert_user_marker(&self, user_id: &str) -> Result<UserMarker> {
        UserQueries::upsert_marker(&self.pool, user_id, Utc::now().naive_utc()).await
    }

    #[inline]
    pub async fn get_user_marker(&self, user_id: &str) -> Result<Option<UserMarker>> {
        UserQueries::get_marker(&self.pool, user_id).await
    }

    #[inline]
    pub async fn shard_counts(&self) -> Result<Vec<ShardCount>> {
        ChunkQueries::shard_counts(&self.pool).await
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    #[inline]
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database performance");

        // Run VACUUM to reclaim space and defragment
        sqlx::query("VACUUM").execute(&self.pool).await?;

        // Run ANALYZE to update table statistics for better query planning
        sqlx::query("ANALYZE").execute(&self.pool).await?;

        debug!("Database optimization completed");
        Ok(())
    }
}
