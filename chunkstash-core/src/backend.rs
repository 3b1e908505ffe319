//! Chunk backend trait
//!
//! Defines the capability contract every backend must provide. The engine
//! holds a backend by this trait and never inspects key structure: a key
//! is whatever the backend hands back from `store_chunk`.

use crate::error::BackendError;
use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_CONNECTIONS};
use async_trait::async_trait;
use bytes::Bytes;

/// Pluggable chunk storage backend
///
/// All implementations must be Send + Sync for use in async contexts.
#[async_trait]
pub trait ChunkBackend: Send + Sync {
    /// Opaque per-chunk key issued by this backend
    type Key: Clone + Send + Sync;

    /// Connect / authenticate / set up
    ///
    /// Must complete before any chunk operation is attempted; calling
    /// `store_chunk` or `fetch_chunk` before success is undefined.
    async fn ready(&self) -> Result<(), BackendError>;

    /// Persist one chunk (at most `chunk_size` bytes), returning a key
    /// sufficient to retrieve exactly those bytes later
    async fn store_chunk(&self, chunk: Bytes) -> Result<Self::Key, BackendError>;

    /// Retrieve the exact bytes previously stored under `key`
    async fn fetch_chunk(&self, key: &Self::Key) -> Result<Bytes, BackendError>;

    /// Maximum concurrent in-flight chunk operations
    fn connections(&self) -> usize {
        DEFAULT_CONNECTIONS
    }

    /// Bytes per chunk
    fn chunk_size(&self) -> usize {
        DEFAULT_CHUNK_SIZE
    }
}

#[async_trait]
impl<B: ChunkBackend + ?Sized> ChunkBackend for std::sync::Arc<B> {
    type Key = B::Key;

    async fn ready(&self) -> Result<(), BackendError> {
        (**self).ready().await
    }

    async fn store_chunk(&self, chunk: Bytes) -> Result<Self::Key, BackendError> {
        (**self).store_chunk(chunk).await
    }

    async fn fetch_chunk(&self, key: &Self::Key) -> Result<Bytes, BackendError> {
        (**self).fetch_chunk(key).await
    }

    fn connections(&self) -> usize {
        (**self).connections()
    }

    fn chunk_size(&self) -> usize {
        (**self).chunk_size()
    }
}
