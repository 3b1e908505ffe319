//! Index file: durable mapping from file paths to key lists
//!
//! Line-oriented and append-only: one JSON object per line,
//! `{"path": "...", "keys": ["..."]}`. Blank lines are skipped. A store
//! appends one line per file; the whole file is loaded before any
//! operation to know which paths are already stored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// One stored file: its path and the ordered chunk keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub keys: Vec<String>,
}

/// In-memory view of the index file
#[derive(Debug, Default)]
pub struct FileIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl FileIndex {
    /// Load the index; a missing file yields an empty index
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read index file {}", path.display()))
            }
        };

        let mut entries = BTreeMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: IndexEntry = serde_json::from_str(line)
                .with_context(|| format!("Malformed index line: {line}"))?;
            entries.insert(entry.path, entry.keys);
        }

        Ok(Self { entries })
    }

    /// Append one entry to the index file and the in-memory view
    pub fn append(&mut self, path: &Path, entry: IndexEntry) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open index file {}", path.display()))?;

        let line = serde_json::to_string(&entry)?;
        writeln!(file, "{line}")?;

        self.entries.insert(entry.path, entry.keys);
        Ok(())
    }

    pub fn contains(&self, file_path: &str) -> bool {
        self.entries.contains_key(file_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose path starts with `prefix`, in path order
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a [String])> {
        self.entries
            .iter()
            .filter(move |(path, _)| path.starts_with(prefix))
            .map(|(path, keys)| (path.as_str(), keys.as_slice()))
    }
}
