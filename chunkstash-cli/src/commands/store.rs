//! Store command
//!
//! Walks a file or directory tree and stores every file not yet present
//! in the index, appending one index line per stored file.

use crate::index::{FileIndex, IndexEntry};
use anyhow::{Context, Result};
use chunkstash_backends::DirBackend;
use chunkstash_core::{chunk_count, ChunkStore};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Store configuration
pub struct StoreConfig {
    pub path: String,
}

/// Run store command
pub async fn run(
    engine: &ChunkStore<DirBackend>,
    index_path: &Path,
    config: StoreConfig,
) -> Result<()> {
    let target = Path::new(&config.path);
    if !target.exists() {
        anyhow::bail!("Path does not exist: {}", config.path);
    }

    let files = if target.is_file() {
        vec![target.to_path_buf()]
    } else {
        collect_files(target).await?
    };

    if files.is_empty() {
        println!("{}", style("No files to store").yellow());
        return Ok(());
    }

    let mut index = FileIndex::load(index_path)?;
    let mut stored_count = 0;
    let mut skipped_count = 0;
    let mut total_bytes: u64 = 0;

    for file_path in &files {
        let entry_path = file_path.display().to_string();
        if index.contains(&entry_path) {
            skipped_count += 1;
            continue;
        }

        let data = fs::read(file_path)
            .await
            .with_context(|| format!("Failed to read {}", file_path.display()))?;

        // Initial length is an estimate; encryption grows the payload, so
        // the callback resizes the bar to the engine's authoritative total.
        let pb = ProgressBar::new(chunk_count(data.len(), engine.chunk_size()) as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}")
                .expect("valid progress template")
                .progress_chars("#>-"),
        );
        pb.set_message(entry_path.clone());

        let keys = engine
            .store_with_progress(&data, |_, total| {
                pb.set_length(total as u64);
                pb.inc(1);
            })
            .await
            .with_context(|| format!("Failed to store {}", file_path.display()))?;
        pb.finish_and_clear();

        println!(
            "{} {} ({} chunks)",
            style("stored").green(),
            entry_path,
            keys.len()
        );

        total_bytes += data.len() as u64;
        index.append(index_path, IndexEntry {
            path: entry_path,
            keys,
        })?;
        stored_count += 1;
    }

    println!("\n{}", style("Store Summary:").bold());
    println!("  {} files stored", style(stored_count).green());
    if skipped_count > 0 {
        println!("  {} files already indexed", style(skipped_count).dim());
    }
    println!("  {} transferred", format_bytes(total_bytes));

    Ok(())
}

/// Collect all files in a directory recursively
async fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries = fs::read_dir(&current).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
