use super::*;
use crate::database::models::{Namespace, NewChunk};
use crate::index::ShardIndex;
use crate::vector::Vector;
use tempfile::TempDir;

async fn create_test_database() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let database = Database::initialize_from_config_dir(temp_dir.path())
        .await
        .expect("Failed to create database");
    (temp_dir, database)
}

async fn store_profile_chunks(database: &Database, user_id: &str, count: usize) -> Vec<String> {
    let mut ids = Vec::new();
    for i in 0..count {
        let chunk = NewChunk::new(
            user_id,
            Namespace::Profile,
            "bio",
            "0",
            format!("Sentence {i}."),
            Vector::basis(4, i % 4),
        );
        ids.push(chunk.chunk_id.clone());
        database.insert(chunk).await.expect("Failed to insert chunk");
    }
    ids
}

#[test]
fn consistency_report_summary_formats_correctly() {
    let inconsistent_report = ConsistencyReport {
        stored_chunks: 150,
        indexed_chunks: 140,
        missing_in_index: vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
        orphaned_in_index: vec!["orphan1".to_string()],
        inconsistent_shards: vec![ShardConsistencyIssue {
            key: ShardKey::new("u1", Namespace::Profile),
            stored_chunks: 10,
            indexed_chunks: 8,
            missing_in_index: vec!["c1".to_string()],
            orphaned_in_index: vec![],
        }],
        is_consistent: false,
    };

    let summary = inconsistent_report.summary();
    assert!(summary.contains("3 missing from index"));
    assert!(summary.contains("1 orphaned in index"));
    assert!(summary.contains("1 shards with issues"));
    assert_eq!(inconsistent_report.total_issues(), 4);

    let consistent_report = ConsistencyReport {
        stored_chunks: 100,
        indexed_chunks: 100,
        missing_in_index: vec![],
        orphaned_in_index: vec![],
        inconsistent_shards: vec![],
        is_consistent: true,
    };

    assert_eq!(consistent_report.total_issues(), 0);
    assert!(consistent_report.summary().contains("Index is consistent"));
}

#[tokio::test]
async fn empty_store_and_registry_are_consistent() {
    let (_temp_dir, database) = create_test_database().await;
    let registry = ShardRegistry::new(4);

    let report = ConsistencyValidator::new(&database, &registry)
        .validate_consistency()
        .await
        .expect("validation should succeed");

    assert!(report.is_consistent);
    assert_eq!(report.stored_chunks, 0);
}

#[tokio::test]
async fn detects_missing_and_orphaned_ids() {
    let (_temp_dir, database) = create_test_database().await;
    let ids = store_profile_chunks(&database, "u1", 3).await;

    let registry = ShardRegistry::new(4);
    let key = ShardKey::new("u1", Namespace::Profile);
    registry.replace(
        &key,
        ShardIndex::from_entries(
            4,
            vec![
                (ids[0].clone(), Vector::basis(4, 0)),
                ("ghost".to_string(), Vector::basis(4, 1)),
            ],
        )
        .expect("should build"),
    );

    let report = ConsistencyValidator::new(&database, &registry)
        .validate_consistency()
        .await
        .expect("validation should succeed");

    assert!(!report.is_consistent);
    assert_eq!(report.stored_chunks, 3);
    assert_eq!(report.indexed_chunks, 2);
    assert_eq!(report.missing_in_index, vec![ids[1].clone(), ids[2].clone()]);
    assert_eq!(report.orphaned_in_index, vec!["ghost".to_string()]);
    assert_eq!(report.inconsistent_shards.len(), 1);
    assert_eq!(report.inconsistent_shards[0].key, key);
}

#[tokio::test]
async fn repair_rebuilds_and_discards_shards() {
    let (_temp_dir, database) = create_test_database().await;
    let ids = store_profile_chunks(&database, "u1", 2).await;

    let registry = ShardRegistry::new(4);
    let stale = ShardKey::new("gone", Namespace::EditedSection);
    registry
        .append(&stale, "stale", Vector::basis(4, 0))
        .expect("append should succeed");

    let validator = ConsistencyValidator::new(&database, &registry);
    let report = validator
        .validate_consistency()
        .await
        .expect("validation should succeed");
    assert_eq!(report.inconsistent_shards.len(), 2);

    let repaired = validator.repair(&report).await.expect("repair should succeed");
    assert_eq!(repaired, 2);

    assert!(registry.get(&stale).is_none());
    assert_eq!(
        registry.chunk_ids(&ShardKey::new("u1", Namespace::Profile)),
        ids
    );

    let after = validator
        .validate_consistency()
        .await
        .expect("validation should succeed");
    assert!(after.is_consistent);
    assert_eq!(validator.repair(&after).await.expect("repair should succeed"), 0);
}
