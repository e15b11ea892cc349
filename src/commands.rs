use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::models::Namespace;
use crate::indexer::IndexManager;
use crate::{IndexError, Result};

/// Open the store under the config directory and run the startup rebuild
#[inline]
pub async fn open_manager(config: &Config) -> Result<IndexManager> {
    let manager = IndexManager::from_config(config).await?;
    let summary = manager.rebuild_all().await?;
    debug!(
        "Loaded {} shards ({} chunks) from {}",
        summary.shards,
        summary.chunks,
        config.database_path().display()
    );
    Ok(manager)
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;

    println!("Configuration directory: {}", config.get_base_dir().display());
    println!("Config file: {}", config.config_file_path().display());
    println!("Database: {}", config.database_path().display());
    println!();
    print!("{rendered}");
    Ok(())
}

/// Write the current (or default) configuration to disk
#[inline]
pub fn save_config(config: &Config) -> Result<()> {
    let existed = config.config_file_path().exists();
    config.save()?;

    if existed {
        println!("Configuration rewritten: {}", config.config_file_path().display());
    } else {
        println!(
            "Default configuration written: {}",
            config.config_file_path().display()
        );
    }
    println!("Edit the file to change the embedding provider, chunk size or search limits.");
    Ok(())
}

#[inline]
pub async fn index_profile(config: &Config, user_id: &str, profile_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(profile_path)?;
    let profile: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        IndexError::InvalidRequest(format!(
            "{} is not valid JSON: {}",
            profile_path.display(),
            e
        ))
    })?;

    let manager = open_manager(config).await?;
    let written = manager.reindex_profile_json(user_id, &profile).await?;

    info!("Profile indexed for {}", user_id);
    println!("Indexed profile for {user_id}: {written} chunks");
    Ok(())
}

#[inline]
pub async fn index_section(
    config: &Config,
    user_id: &str,
    section_id: &str,
    text: &str,
) -> Result<()> {
    let manager = open_manager(config).await?;
    let chunk_ids = manager.index_section(user_id, section_id, text).await?;

    println!(
        "Indexed section {section_id} for {user_id}: {} chunks",
        chunk_ids.len()
    );
    for chunk_id in chunk_ids {
        println!("  {chunk_id}");
    }
    Ok(())
}

#[inline]
pub async fn delete_section(config: &Config, user_id: &str, section_id: &str) -> Result<()> {
    let manager = open_manager(config).await?;
    let removed = manager.delete_section(user_id, section_id).await?;

    if removed == 0 {
        println!("Section {section_id} for {user_id} had no chunks");
    } else {
        println!("Deleted section {section_id} for {user_id}: {removed} chunks removed");
    }
    Ok(())
}

#[inline]
pub async fn search(
    config: &Config,
    user_id: &str,
    query: &str,
    namespace: Namespace,
    top_k: Option<usize>,
    sections: &[String],
    json: bool,
) -> Result<()> {
    let manager = open_manager(config).await?;
    let top_k = top_k.unwrap_or(config.search.default_top_k);
    let filter = (!sections.is_empty()).then_some(sections);

    let results = manager
        .search_text(user_id, namespace, query, top_k, filter)
        .await?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&results).context("Failed to render results")?;
        println!("{rendered}");
        return Ok(());
    }

    if results.is_empty() {
        println!("No results for {user_id} in {namespace}");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} ({}:{})",
            rank + 1,
            result.score,
            result.chunk_id,
            result.source_type,
            result.source_id
        );
        if let Some(section_id) = &result.section_id {
            println!("   Section: {section_id}");
        }
        println!("   {}", result.text);
    }
    Ok(())
}

#[inline]
pub async fn embed(config: &Config, text: &str) -> Result<()> {
    let manager = IndexManager::from_config(config).await?;
    let vector = manager.embed(text).await?;

    let rendered = serde_json::to_string(vector.as_slice()).context("Failed to render vector")?;
    println!("{rendered}");
    Ok(())
}

#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    let manager = open_manager(config).await?;
    let status = manager.status().await?;

    println!("Chunk Index Status");
    println!("{}", "=".repeat(50));
    println!("Database: {}", config.database_path().display());
    println!("Embedding dimension: {}", status.dimension);
    println!();

    if status.shards.is_empty() {
        println!("No chunks have been indexed yet.");
        return Ok(());
    }

    for shard in &status.shards {
        let marker = if shard.is_in_sync() { "ok" } else { "out of sync" };
        println!(
            "{:<40} stored {:>6}  indexed {:>6}  {}",
            shard.key.to_string(),
            shard.stored_chunks,
            shard.indexed_chunks,
            marker
        );
    }

    println!();
    println!("Summary:");
    println!("  Shards: {}", status.shards.len());
    println!("  Stored chunks: {}", status.total_stored());
    println!("  Indexed chunks: {}", status.total_indexed());
    Ok(())
}

#[inline]
pub async fn check(config: &Config, repair: bool) -> Result<()> {
    let manager = open_manager(config).await?;
    let report = manager.check_consistency().await?;

    println!("{}", report.summary());
    for issue in &report.inconsistent_shards {
        println!(
            "  {}: {} stored, {} indexed",
            issue.key, issue.stored_chunks, issue.indexed_chunks
        );
    }

    if repair && !report.is_consistent {
        let repaired = manager.repair(&report).await?;
        println!("Rebuilt {repaired} shards from the store");
    }
    Ok(())
}
