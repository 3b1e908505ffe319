//! Fetch command
//!
//! Restores indexed files whose path starts with a prefix, skipping files
//! that already exist locally.

use crate::commands::store::format_bytes;
use crate::index::FileIndex;
use anyhow::{Context, Result};
use chunkstash_backends::DirBackend;
use chunkstash_core::ChunkStore;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::fs;

/// Fetch configuration
pub struct FetchConfig {
    pub prefix: String,
}

/// Run fetch command
pub async fn run(
    engine: &ChunkStore<DirBackend>,
    index_path: &Path,
    config: FetchConfig,
) -> Result<()> {
    let index = FileIndex::load(index_path)?;

    let targets: Vec<(String, Vec<String>)> = index
        .with_prefix(&config.prefix)
        .map(|(path, keys)| (path.to_string(), keys.to_vec()))
        .collect();

    if targets.is_empty() {
        println!(
            "{} no indexed files match '{}'",
            style("!").yellow(),
            config.prefix
        );
        return Ok(());
    }

    let mut fetched_count = 0;
    let mut skipped_count = 0;
    let mut total_bytes: u64 = 0;

    for (entry_path, keys) in &targets {
        let local = Path::new(entry_path);
        if local.exists() {
            skipped_count += 1;
            continue;
        }

        if let Some(parent) = local.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let pb = ProgressBar::new(keys.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}")
                .expect("valid progress template")
                .progress_chars("#>-"),
        );
        pb.set_message(entry_path.clone());

        let data = engine
            .fetch_with_progress(keys, |_| pb.inc(1))
            .await
            .with_context(|| format!("Failed to fetch {entry_path}"))?;
        pb.finish_and_clear();

        fs::write(local, &data)
            .await
            .with_context(|| format!("Failed to write {entry_path}"))?;

        println!(
            "{} {} ({})",
            style("fetched").green(),
            entry_path,
            format_bytes(data.len() as u64)
        );

        total_bytes += data.len() as u64;
        fetched_count += 1;
    }

    println!("\n{}", style("Fetch Summary:").bold());
    println!("  {} files fetched", style(fetched_count).green());
    if skipped_count > 0 {
        println!("  {} files already present", style(skipped_count).dim());
    }
    println!("  {} transferred", format_bytes(total_bytes));

    Ok(())
}
