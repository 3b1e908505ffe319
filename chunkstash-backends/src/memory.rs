//! In-memory chunk backend
//!
//! Used for testing and development. Not persistent. Keys are issued from
//! a monotonic counter; like any backend key they are opaque to the
//! engine.

use async_trait::async_trait;
use bytes::Bytes;
use chunkstash_core::error::BackendError;
use chunkstash_core::ChunkBackend;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory chunk backend
pub struct MemoryBackend {
    chunks: RwLock<HashMap<u64, Bytes>>,
    next_key: AtomicU64,
    bytes_used: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            next_key: AtomicU64::new(0),
            bytes_used: AtomicU64::new(0),
        }
    }

    /// Number of chunks currently held
    pub fn chunk_count(&self) -> usize {
        self.chunks.read().len()
    }

    /// Total bytes currently held
    pub fn bytes_used(&self) -> u64 {
        self.bytes_used.load(Ordering::SeqCst)
    }

    /// Drop all stored chunks
    pub fn clear(&self) {
        let mut chunks = self.chunks.write();
        chunks.clear();
        self.bytes_used.store(0, Ordering::SeqCst);
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkBackend for MemoryBackend {
    type Key = u64;

    async fn ready(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn store_chunk(&self, chunk: Bytes) -> Result<u64, BackendError> {
        let key = self.next_key.fetch_add(1, Ordering::SeqCst);
        self.bytes_used
            .fetch_add(chunk.len() as u64, Ordering::SeqCst);
        self.chunks.write().insert(key, chunk);
        Ok(key)
    }

    async fn fetch_chunk(&self, key: &u64) -> Result<Bytes, BackendError> {
        self.chunks
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }
}
