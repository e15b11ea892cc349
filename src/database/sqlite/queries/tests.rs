use super::*;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use crate::vector::Vector;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true),
        )
        .await
        .expect("Failed to create test pool");

    sqlx::raw_sql(include_str!("../migrations/001_initial_schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

#[tokio::test]
async fn chunk_insert_get_delete() {
    let (_temp_dir, pool) = create_test_pool().await;
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");

    let chunk = NewChunk::new(
        "u1",
        Namespace::EditedSection,
        "user_edited",
        "0",
        "A section.",
        Vector::basis(3, 1),
    )
    .with_section("s1");
    let created_at = Utc::now().naive_utc();

    ChunkQueries::insert(&mut conn, &chunk, created_at)
        .await
        .expect("Failed to insert chunk");
    drop(conn);

    let fetched = ChunkQueries::get(&pool, &chunk.chunk_id)
        .await
        .expect("Failed to get chunk")
        .expect("Chunk should exist");
    assert_eq!(fetched.namespace, Namespace::EditedSection);
    assert_eq!(fetched.section_id.as_deref(), Some("s1"));
    assert_eq!(fetched.created_at, created_at);

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let removed = ChunkQueries::delete_by_section(&mut conn, "u1", "s1")
        .await
        .expect("Failed to delete section");
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn namespace_is_stored_as_kebab_case_text() {
    let (_temp_dir, pool) = create_test_pool().await;
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");

    let chunk = NewChunk::new(
        "u1",
        Namespace::EditedSection,
        "user_edited",
        "0",
        "Text.",
        Vector::basis(3, 0),
    );
    ChunkQueries::insert(&mut conn, &chunk, Utc::now().naive_utc())
        .await
        .expect("Failed to insert chunk");

    let stored: String = sqlx::query_scalar("SELECT namespace FROM chunks")
        .fetch_one(&mut *conn)
        .await
        .expect("Failed to read namespace");
    assert_eq!(stored, "edited-section");
}

#[tokio::test]
async fn user_marker_upsert_updates_timestamp() {
    let (_temp_dir, pool) = create_test_pool().await;

    let earlier = Utc::now().naive_utc() - chrono::Duration::hours(1);
    let later = Utc::now().naive_utc();

    UserQueries::upsert_marker(&pool, "u1", earlier)
        .await
        .expect("Failed to insert marker");
    UserQueries::upsert_marker(&pool, "u1", later)
        .await
        .expect("Failed to update marker");

    let marker = UserQueries::get_marker(&pool, "u1")
        .await
        .expect("Failed to get marker")
        .expect("Marker should exist");
    assert_eq!(marker.last_indexed_at, later);
}
