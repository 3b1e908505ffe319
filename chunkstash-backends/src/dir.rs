//! Local-directory chunk backend
//!
//! Stores one file per chunk under a root directory. Keys are random
//! UUID filenames, so identical chunks stored twice get distinct keys.
//! Local writes are cheap, so this backend defaults to large chunks.

use async_trait::async_trait;
use bytes::Bytes;
use chunkstash_core::error::BackendError;
use chunkstash_core::ChunkBackend;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Default chunk size for local-directory storage (4 MiB)
pub const DIR_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Chunk backend backed by files in a local directory
pub struct DirBackend {
    root: PathBuf,
}

impl DirBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunk_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ChunkBackend for DirBackend {
    type Key = String;

    async fn ready(&self) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.root).await?;
        debug!(root = %self.root.display(), "chunk directory ready");
        Ok(())
    }

    async fn store_chunk(&self, chunk: Bytes) -> Result<String, BackendError> {
        let key = Uuid::new_v4().simple().to_string();
        tokio::fs::write(self.chunk_path(&key), &chunk).await?;
        debug!(key = %key, size = chunk.len(), "stored chunk");
        Ok(key)
    }

    async fn fetch_chunk(&self, key: &String) -> Result<Bytes, BackendError> {
        match tokio::fs::read(self.chunk_path(key)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BackendError::NotFound(key.clone()))
            }
            Err(e) => Err(BackendError::Io(e)),
        }
    }

    fn chunk_size(&self) -> usize {
        DIR_CHUNK_SIZE
    }
}
