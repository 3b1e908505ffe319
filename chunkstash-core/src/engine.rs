//! Chunked store engine
//!
//! Orchestrates whole-payload encryption, splitting, bounded-concurrency
//! dispatch of chunk operations against a [`ChunkBackend`], and ordered
//! reassembly.
//!
//! Concurrency model: one future per chunk, raced through a
//! `FuturesUnordered`; each future takes a permit from a counting
//! semaphore before issuing its backend call, so at most `connections`
//! operations are in flight at any instant. Completions race, so every
//! completion writes into a pre-sized slot addressed by its chunk index,
//! never appended in completion order. On the first failure the remaining
//! futures are dropped, cancelling outstanding backend calls; chunks
//! already stored are not rolled back.

use crate::backend::ChunkBackend;
use crate::chunk::split_payload;
use crate::crypto::{self, EncryptionConfig};
use crate::error::{EngineError, Result};
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::debug;

/// Engine tunables, resolved at construction
///
/// Unset fields fall back to the backend's own tunables.
#[derive(Debug, Default)]
pub struct EngineConfig {
    connections: Option<usize>,
    chunk_size: Option<usize>,
    encryption: Option<EncryptionConfig>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the maximum number of concurrent in-flight chunk operations
    pub fn with_connections(mut self, connections: usize) -> Self {
        self.connections = Some(connections);
        self
    }

    /// Override the number of bytes per chunk
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Encrypt payloads before chunking; decrypt after reassembly
    pub fn with_encryption(mut self, encryption: EncryptionConfig) -> Self {
        self.encryption = Some(encryption);
        self
    }
}

/// Chunked object store over a pluggable backend
///
/// `store` splits a payload into chunks and returns one opaque key per
/// chunk, in payload order; `fetch` takes that key list back and returns
/// the original bytes. The key list is the only artifact the caller must
/// retain; losing or reordering it is unrecoverable.
pub struct ChunkStore<B: ChunkBackend> {
    backend: B,
    connections: usize,
    chunk_size: usize,
    encryption: Option<EncryptionConfig>,
}

impl<B: ChunkBackend> ChunkStore<B> {
    /// Create an engine with the backend's own tunables and no encryption
    pub fn new(backend: B) -> Self {
        let connections = backend.connections();
        let chunk_size = backend.chunk_size();
        Self {
            backend,
            connections,
            chunk_size,
            encryption: None,
        }
    }

    /// Create an engine with explicit configuration
    pub fn with_config(backend: B, config: EngineConfig) -> Result<Self> {
        let connections = config.connections.unwrap_or_else(|| backend.connections());
        let chunk_size = config.chunk_size.unwrap_or_else(|| backend.chunk_size());

        if connections == 0 {
            return Err(EngineError::InvalidConfig(
                "connections must be positive".to_string(),
            ));
        }
        if chunk_size == 0 {
            return Err(EngineError::InvalidConfig(
                "chunk size must be positive".to_string(),
            ));
        }

        Ok(Self {
            backend,
            connections,
            chunk_size,
            encryption: config.encryption,
        })
    }

    /// Access the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn connections(&self) -> usize {
        self.connections
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Prepare the backend; must succeed before any store or fetch
    pub async fn ready(&self) -> Result<()> {
        self.backend.ready().await.map_err(EngineError::from)
    }

    /// Store a payload, returning one key per chunk in payload order
    pub async fn store(&self, payload: &[u8]) -> Result<Vec<B::Key>> {
        self.store_with_progress(payload, |_, _| {}).await
    }

    /// Store a payload, invoking `progress(chunk_index, total_chunks)` as
    /// each chunk completes
    ///
    /// Completions race, so indices are not delivered in order; the
    /// callback fires exactly once per chunk.
    pub async fn store_with_progress<F>(&self, payload: &[u8], progress: F) -> Result<Vec<B::Key>>
    where
        F: Fn(usize, usize) + Send,
    {
        let data = match &self.encryption {
            Some(encryption) => Bytes::from(crypto::encrypt(payload, encryption)?),
            None => Bytes::copy_from_slice(payload),
        };

        let parts = split_payload(&data, self.chunk_size);
        let total = parts.len();
        debug!(bytes = data.len(), chunks = total, "storing payload");

        let limiter = Semaphore::new(self.connections);
        let mut ops: FuturesUnordered<_> = parts
            .into_iter()
            .enumerate()
            .map(|(index, part)| {
                let limiter = &limiter;
                let backend = &self.backend;
                async move {
                    let _permit = limiter
                        .acquire()
                        .await
                        .map_err(|_| EngineError::Internal("limiter closed".to_string()))?;
                    match backend.store_chunk(part).await {
                        Ok(key) => Ok((index, key)),
                        Err(source) => Err(EngineError::ChunkStore { index, source }),
                    }
                }
            })
            .collect();

        let mut slots: Vec<Option<B::Key>> = (0..total).map(|_| None).collect();
        while let Some(completed) = ops.next().await {
            // An early return here drops `ops`, cancelling in-flight chunk stores
            let (index, key) = completed?;
            slots[index] = Some(key);
            progress(index, total);
        }
        drop(ops);

        let mut keys = Vec::with_capacity(total);
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(key) => keys.push(key),
                None => {
                    return Err(EngineError::Internal(format!(
                        "chunk {index} never completed"
                    )))
                }
            }
        }

        debug!(chunks = total, "payload stored");
        Ok(keys)
    }

    /// Fetch a payload from an ordered key list
    pub async fn fetch(&self, keys: &[B::Key]) -> Result<Bytes> {
        self.fetch_with_progress(keys, |_| {}).await
    }

    /// Fetch a payload, invoking `progress(chunk_index)` as each chunk
    /// completes (order not guaranteed, once per chunk)
    pub async fn fetch_with_progress<F>(&self, keys: &[B::Key], progress: F) -> Result<Bytes>
    where
        F: Fn(usize) + Send,
    {
        let total = keys.len();
        debug!(chunks = total, "fetching payload");

        let limiter = Semaphore::new(self.connections);
        let mut ops: FuturesUnordered<_> = keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                let limiter = &limiter;
                let backend = &self.backend;
                async move {
                    let _permit = limiter
                        .acquire()
                        .await
                        .map_err(|_| EngineError::Internal("limiter closed".to_string()))?;
                    match backend.fetch_chunk(key).await {
                        Ok(chunk) => Ok((index, chunk)),
                        Err(source) => Err(EngineError::ChunkFetch { index, source }),
                    }
                }
            })
            .collect();

        let mut slots: Vec<Option<Bytes>> = (0..total).map(|_| None).collect();
        while let Some(completed) = ops.next().await {
            let (index, chunk) = completed?;
            slots[index] = Some(chunk);
            progress(index);
        }
        drop(ops);

        // Assemble strictly in index order, regardless of completion order
        let mut assembled = Vec::new();
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(chunk) => assembled.extend_from_slice(&chunk),
                None => {
                    return Err(EngineError::Internal(format!(
                        "chunk {index} never completed"
                    )))
                }
            }
        }

        let payload = match &self.encryption {
            Some(encryption) => crypto::decrypt(&assembled, encryption)?,
            None => assembled,
        };

        debug!(bytes = payload.len(), "payload fetched");
        Ok(Bytes::from(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CipherAlgorithm, EncryptionKey};
    use crate::error::BackendError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory backend with per-call latency jitter, in-flight
    /// instrumentation and failure injection
    #[derive(Default)]
    struct TestBackend {
        chunks: Mutex<HashMap<u64, Bytes>>,
        next_key: AtomicU64,
        jitter: bool,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        connections: Option<usize>,
        /// Fail `store_chunk` when the chunk equals these bytes
        fail_store_on: Option<Bytes>,
        /// Fail `fetch_chunk` for this key
        fail_fetch_key: Option<u64>,
    }

    impl TestBackend {
        fn new() -> Self {
            Self::default()
        }

        fn with_jitter() -> Self {
            Self {
                jitter: true,
                ..Self::default()
            }
        }

        fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        async fn simulate_latency(&self) {
            if self.jitter {
                let ms = rand::random::<u64>() % 5;
                tokio::time::sleep(Duration::from_millis(ms)).await;
            } else {
                tokio::task::yield_now().await;
            }
        }

        fn stored_chunks(&self) -> Vec<Bytes> {
            self.chunks.lock().unwrap().values().cloned().collect()
        }
    }

    #[async_trait]
    impl ChunkBackend for TestBackend {
        type Key = u64;

        async fn ready(&self) -> std::result::Result<(), BackendError> {
            Ok(())
        }

        async fn store_chunk(&self, chunk: Bytes) -> std::result::Result<u64, BackendError> {
            self.enter();
            self.simulate_latency().await;
            let result = if self.fail_store_on.as_ref() == Some(&chunk) {
                Err(BackendError::Backend("injected store failure".to_string()))
            } else {
                let key = self.next_key.fetch_add(1, Ordering::SeqCst);
                self.chunks.lock().unwrap().insert(key, chunk);
                Ok(key)
            };
            self.exit();
            result
        }

        async fn fetch_chunk(&self, key: &u64) -> std::result::Result<Bytes, BackendError> {
            self.enter();
            self.simulate_latency().await;
            let result = if self.fail_fetch_key == Some(*key) {
                Err(BackendError::Backend("injected fetch failure".to_string()))
            } else {
                self.chunks
                    .lock()
                    .unwrap()
                    .get(key)
                    .cloned()
                    .ok_or_else(|| BackendError::NotFound(key.to_string()))
            };
            self.exit();
            result
        }

        fn connections(&self) -> usize {
            self.connections.unwrap_or(crate::DEFAULT_CONNECTIONS)
        }

        fn chunk_size(&self) -> usize {
            4
        }
    }

    fn engine_with_chunk_size(chunk_size: usize) -> ChunkStore<TestBackend> {
        ChunkStore::with_config(
            TestBackend::new(),
            EngineConfig::new().with_chunk_size(chunk_size),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_store_fetch_scenario() {
        let engine = engine_with_chunk_size(4);
        engine.ready().await.unwrap();

        let keys = engine.store(b"ABCDEFGHIJ").await.unwrap();
        assert_eq!(keys.len(), 3);

        let mut stored = engine.backend().stored_chunks();
        stored.sort();
        assert_eq!(
            stored,
            vec![
                Bytes::from_static(b"ABCD"),
                Bytes::from_static(b"EFGH"),
                Bytes::from_static(b"IJ"),
            ]
        );

        let payload = engine.fetch(&keys).await.unwrap();
        assert_eq!(&payload[..], b"ABCDEFGHIJ");
    }

    #[tokio::test]
    async fn test_roundtrip_payload_classes() {
        // empty, sub-chunk, exact multiple, multiple plus remainder
        for len in [0usize, 3, 16, 19] {
            let engine = engine_with_chunk_size(4);
            let payload: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();

            let keys = engine.store(&payload).await.unwrap();
            let fetched = engine.fetch(&keys).await.unwrap();
            assert_eq!(&fetched[..], payload.as_slice(), "payload length {len}");
        }
    }

    #[tokio::test]
    async fn test_empty_payload_produces_one_key() {
        let engine = engine_with_chunk_size(4);
        let keys = engine.store(b"").await.unwrap();
        assert_eq!(keys.len(), 1);

        let fetched = engine.fetch(&keys).await.unwrap();
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn test_exact_multiple_produces_no_extra_key() {
        let engine = engine_with_chunk_size(4);
        let keys = engine.store(b"ABCDEFGH").await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_roundtrip_encrypted() {
        for algorithm in [CipherAlgorithm::Aes256Gcm, CipherAlgorithm::ChaCha20Poly1305] {
            let config = EngineConfig::new()
                .with_chunk_size(4)
                .with_encryption(EncryptionConfig::new(algorithm, EncryptionKey::generate()));
            let engine = ChunkStore::with_config(TestBackend::new(), config).unwrap();

            let payload = b"the quick brown fox jumps over the lazy dog";
            let keys = engine.store(payload).await.unwrap();
            let fetched = engine.fetch(&keys).await.unwrap();
            assert_eq!(&fetched[..], payload.as_slice());

            // No plaintext chunk leaves the engine
            let stored = engine.backend().stored_chunks();
            assert!(stored.iter().all(|c| c != &Bytes::from_static(b"the ")));
        }
    }

    #[tokio::test]
    async fn test_encrypted_empty_payload_roundtrip() {
        let config = EngineConfig::new()
            .with_chunk_size(4)
            .with_encryption(EncryptionConfig::aes256_gcm(EncryptionKey::generate()));
        let engine = ChunkStore::with_config(TestBackend::new(), config).unwrap();

        let keys = engine.store(b"").await.unwrap();
        let fetched = engine.fetch(&keys).await.unwrap();
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_key_fails_with_decryption_error() {
        let backend = std::sync::Arc::new(TestBackend::new());

        let store_engine = ChunkStore::with_config(
            backend.clone(),
            EngineConfig::new()
                .with_chunk_size(4)
                .with_encryption(EncryptionConfig::aes256_gcm(EncryptionKey::generate())),
        )
        .unwrap();
        let keys = store_engine.store(b"sensitive payload").await.unwrap();

        let fetch_engine = ChunkStore::with_config(
            backend,
            EngineConfig::new()
                .with_chunk_size(4)
                .with_encryption(EncryptionConfig::aes256_gcm(EncryptionKey::generate())),
        )
        .unwrap();
        let result = fetch_engine.fetch(&keys).await;

        assert!(matches!(result, Err(EngineError::Decryption(_))));
    }

    #[tokio::test]
    async fn test_ordering_under_racing_completions() {
        let engine = ChunkStore::with_config(
            TestBackend::with_jitter(),
            EngineConfig::new().with_chunk_size(16).with_connections(8),
        )
        .unwrap();

        let payload: Vec<u8> = (0..2048).map(|i| (i % 251) as u8).collect();
        let keys = engine.store(&payload).await.unwrap();
        assert_eq!(keys.len(), 128);

        let fetched = engine.fetch(&keys).await.unwrap();
        assert_eq!(&fetched[..], payload.as_slice());
    }

    #[tokio::test]
    async fn test_bounded_concurrency() {
        let engine = ChunkStore::with_config(
            TestBackend::with_jitter(),
            EngineConfig::new().with_chunk_size(4).with_connections(3),
        )
        .unwrap();

        let payload = vec![7u8; 200]; // 50 chunks
        let keys = engine.store(&payload).await.unwrap();
        assert!(engine.backend().max_in_flight.load(Ordering::SeqCst) <= 3);

        engine.backend().max_in_flight.store(0, Ordering::SeqCst);
        engine.fetch(&keys).await.unwrap();
        assert!(engine.backend().max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_store_failure_reports_chunk_index() {
        let backend = TestBackend {
            fail_store_on: Some(Bytes::from_static(b"MNOP")),
            ..TestBackend::new()
        };
        let engine =
            ChunkStore::with_config(backend, EngineConfig::new().with_chunk_size(4)).unwrap();

        // chunk 3 of "ABCD EFGH IJKL MNOP QRST" is "MNOP"
        let result = engine.store(b"ABCDEFGHIJKLMNOPQRST").await;
        match result {
            Err(EngineError::ChunkStore { index, .. }) => assert_eq!(index, 3),
            other => panic!("expected ChunkStore error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_chunk_index() {
        let engine = engine_with_chunk_size(4);
        let keys = engine.store(b"ABCDEFGHIJKLMNOPQRST").await.unwrap();

        let backend = TestBackend {
            chunks: Mutex::new(engine.backend().chunks.lock().unwrap().clone()),
            fail_fetch_key: Some(keys[3]),
            ..TestBackend::new()
        };
        let engine =
            ChunkStore::with_config(backend, EngineConfig::new().with_chunk_size(4)).unwrap();

        let result = engine.fetch(&keys).await;
        match result {
            Err(EngineError::ChunkFetch { index, .. }) => assert_eq!(index, 3),
            other => panic!("expected ChunkFetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_unknown_key_is_not_found() {
        let engine = engine_with_chunk_size(4);
        let result = engine.fetch(&[42u64]).await;
        match result {
            Err(EngineError::ChunkFetch { index: 0, source }) => {
                assert!(matches!(source, BackendError::NotFound(_)));
            }
            other => panic!("expected ChunkFetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_progress_fires_once_per_chunk() {
        let engine = ChunkStore::with_config(
            TestBackend::with_jitter(),
            EngineConfig::new().with_chunk_size(4),
        )
        .unwrap();

        let seen = Mutex::new(Vec::new());
        let keys = engine
            .store_with_progress(b"ABCDEFGHIJKLMNOPQRST", |index, total| {
                assert_eq!(total, 5);
                seen.lock().unwrap().push(index);
            })
            .await
            .unwrap();

        let mut indices = seen.lock().unwrap().clone();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);

        let seen = Mutex::new(Vec::new());
        engine
            .fetch_with_progress(&keys, |index| seen.lock().unwrap().push(index))
            .await
            .unwrap();
        let mut indices = seen.lock().unwrap().clone();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_progress_total_counts_encrypted_chunks() {
        let key = EncryptionKey::generate();
        let engine = ChunkStore::with_config(
            TestBackend::new(),
            EngineConfig::new()
                .with_chunk_size(4)
                .with_encryption(EncryptionConfig::aes256_gcm(key)),
        )
        .unwrap();

        let payload = b"ABCDEFGH";
        let totals = Mutex::new(Vec::new());
        let keys = engine
            .store_with_progress(payload, |_, total| totals.lock().unwrap().push(total))
            .await
            .unwrap();

        // Ciphertext carries the nonce and auth tag, so the reported total
        // exceeds the plaintext chunk count and matches the stored keys.
        let ciphertext_len =
            payload.len() + crate::crypto::NONCE_SIZE + crate::crypto::TAG_SIZE;
        let expected = crate::chunk::chunk_count(ciphertext_len, 4);
        assert!(expected > crate::chunk::chunk_count(payload.len(), 4));
        assert_eq!(keys.len(), expected);
        for total in totals.lock().unwrap().iter() {
            assert_eq!(*total, expected);
        }
    }

    #[tokio::test]
    async fn test_zero_tunables_rejected() {
        let result = ChunkStore::with_config(
            TestBackend::new(),
            EngineConfig::new().with_connections(0),
        );
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));

        let result =
            ChunkStore::with_config(TestBackend::new(), EngineConfig::new().with_chunk_size(0));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_engine_defaults_come_from_backend() {
        let engine = ChunkStore::new(TestBackend::new());
        assert_eq!(engine.connections(), crate::DEFAULT_CONNECTIONS);
        assert_eq!(engine.chunk_size(), 4);
    }
}
