//! Configuration management
//!
//! Config directory: ~/.chunkstash/ (cross-platform)
//!
//! Config file format (~/.chunkstash/config.toml):
//! ```toml
//! [storage]
//! root = "/var/lib/chunkstash/chunks"
//!
//! [index]
//! path = "/var/lib/chunkstash/files.jsonl"
//!
//! [encryption]
//! cipher = "aes-256-gcm"
//! ```
//!
//! Environment variables provide defaults when the file is absent:
//! `CHUNKSTASH_ROOT`, `CHUNKSTASH_INDEX`, `CHUNKSTASH_CIPHER`. The
//! passphrase is never stored; it comes from `CHUNKSTASH_PASSPHRASE` or
//! the `--passphrase` flag.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Structure of ~/.chunkstash/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StashConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub index: IndexSettings,

    #[serde(default)]
    pub encryption: EncryptionSettings,
}

/// Chunk storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory chunks are stored under
    #[serde(default = "default_root")]
    pub root: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> String {
    std::env::var("CHUNKSTASH_ROOT").unwrap_or_else(|_| "stash/chunks".to_string())
}

/// Index file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Path of the JSON-lines index mapping file paths to key lists
    #[serde(default = "default_index_path")]
    pub path: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

fn default_index_path() -> String {
    std::env::var("CHUNKSTASH_INDEX").unwrap_or_else(|_| "stash/files.jsonl".to_string())
}

/// Encryption settings (cipher only; the passphrase is never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionSettings {
    #[serde(default = "default_cipher")]
    pub cipher: String,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            cipher: default_cipher(),
        }
    }
}

fn default_cipher() -> String {
    std::env::var("CHUNKSTASH_CIPHER").unwrap_or_else(|_| "aes-256-gcm".to_string())
}

/// Path of the config file: ~/.chunkstash/config.toml
pub fn config_file_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".chunkstash").join("config.toml"))
}

/// Load configuration, falling back to defaults when the file is absent
/// or unreadable
pub fn load_config() -> StashConfig {
    let Ok(path) = config_file_path() else {
        return StashConfig::default();
    };

    match fs::read_to_string(&path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => StashConfig::default(),
    }
}

/// Write configuration to ~/.chunkstash/config.toml
pub fn save_config(config: &StashConfig) -> Result<()> {
    let path = config_file_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&path, contents).context("Failed to write config file")?;
    Ok(())
}
