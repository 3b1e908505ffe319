//! List command
//!
//! Shows indexed paths and their chunk counts.

use crate::index::FileIndex;
use anyhow::Result;
use console::style;
use std::path::Path;

/// List configuration
pub struct ListConfig {
    pub prefix: Option<String>,
}

/// Run list command
pub fn run(index_path: &Path, config: ListConfig) -> Result<()> {
    let index = FileIndex::load(index_path)?;

    if index.is_empty() {
        println!("{}", style("Index is empty").yellow());
        return Ok(());
    }

    let prefix = config.prefix.as_deref().unwrap_or("");
    let mut shown = 0;
    for (path, keys) in index.with_prefix(prefix) {
        println!("{:>6}  {}", keys.len(), path);
        shown += 1;
    }

    println!(
        "\n{} {} of {} indexed files (chunks  path)",
        style("Listed").cyan(),
        shown,
        index.len()
    );

    Ok(())
}
