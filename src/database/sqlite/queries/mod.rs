#[cfg(test)]
mod tests;

use super::models::*;
use crate::{IndexError, Result};
use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

pub struct ChunkQueries;

impl ChunkQueries {
    /// Insert one chunk on an open connection or transaction
    #[inline]
    pub async fn insert(
        conn: &mut SqliteConnection,
        chunk: &NewChunk,
        created_at: NaiveDateTime,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO chunks (chunk_id, user_id, namespace, section_id, source_type, source_id, text, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.chunk_id)
        .bind(&chunk.user_id)
        .bind(chunk.namespace)
        .bind(&chunk.section_id)
        .bind(&chunk.source_type)
        .bind(&chunk.source_id)
        .bind(&chunk.text)
        .bind(chunk.embedding.to_bytes())
        .bind(created_at)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!("Rejected duplicate chunk id {}", chunk.chunk_id);
                Err(IndexError::DuplicateId(chunk.chunk_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[inline]
    pub async fn get(pool: &SqlitePool, chunk_id: &str) -> Result<Option<Chunk>> {
        let row = sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT chunk_id, user_id, namespace, section_id, source_type, source_id, text, embedding, created_at
            FROM chunks WHERE chunk_id = ?
            "#,
        )
        .bind(chunk_id)
        .fetch_optional(pool)
        .await?;

        row.map(Chunk::try_from).transpose()
    }

    /// Every chunk, grouped by shard and in insertion order within a shard
    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Chunk>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT chunk_id, user_id, namespace, section_id, source_type, source_id, text, embedding, created_at
            FROM chunks ORDER BY user_id, namespace, rowid
            "#,
        )
        .fetch_all(pool)
        .await?;

        debug!("Loaded {} chunks", rows.len());
        rows.into_iter().map(Chunk::try_from).collect()
    }

    #[inline]
    pub async fn list_by_shard(
        pool: &SqlitePool,
        user_id: &str,
        namespace: Namespace,
    ) -> Result<Vec<Chunk>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            r#"
            SELECT chunk_id, user_id, namespace, section_id, source_type, source_id, text, embedding, created_at
            FROM chunks WHERE user_id = ? AND namespace = ? ORDER BY rowid
            "#,
        )
        .bind(user_id)
        .bind(namespace)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Chunk::try_from).collect()
    }

    #[inline]
    pub async fn delete_by_shard(
        conn: &mut SqliteConnection,
        user_id: &str,
        namespace: Namespace,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE user_id = ? AND namespace = ?")
            .bind(user_id)
            .bind(namespace)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove a section's chunks from every namespace
    #[inline]
    pub async fn delete_by_section(
        conn: &mut SqliteConnection,
        user_id: &str,
        section_id: &str,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE user_id = ? AND section_id = ?")
            .bind(user_id)
            .bind(section_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    #[inline]
    pub async fn shard_counts(pool: &SqlitePool) -> Result<Vec<ShardCount>> {
        let counts = sqlx::query_as::<_, ShardCount>(
            r#"
            SELECT user_id, namespace, COUNT(*) AS count
            FROM chunks GROUP BY user_id, namespace ORDER BY user_id, namespace
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(counts)
    }
}

pub struct UserQueries;

impl UserQueries {
    #[inline]
    pub async fn upsert_marker(
        pool: &SqlitePool,
        user_id: &str,
        indexed_at: NaiveDateTime,
    ) -> Result<UserMarker> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, last_indexed_at) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET last_indexed_at = excluded.last_indexed_at
            "#,
        )
        .bind(user_id)
        .bind(indexed_at)
        .execute(pool)
        .await?;

        Ok(UserMarker {
            user_id: user_id.to_string(),
            last_indexed_at: indexed_at,
        })
    }

    #[inline]
    pub async fn get_marker(pool: &SqlitePool, user_id: &str) -> Result<Option<UserMarker>> {
        let marker = sqlx::query_as::<_, UserMarker>(
            "SELECT user_id, last_indexed_at FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(marker)
    }
}
