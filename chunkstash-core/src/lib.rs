//! chunkstash core library
//!
//! Backend-agnostic chunked object storage: a payload is optionally
//! encrypted as a whole, split into fixed-size chunks, and each chunk is
//! persisted through a pluggable [`ChunkBackend`] that hands back an
//! opaque key. The ordered key list is all a caller needs to reassemble
//! the payload later.
//!
//! This crate provides:
//! - the [`ChunkBackend`] capability trait backends implement
//! - the [`ChunkStore`] engine (split, bounded-concurrency dispatch,
//!   ordered reassembly)
//! - AEAD encryption helpers (AES-256-GCM, ChaCha20-Poly1305)
//! - the error taxonomy ([`BackendError`], [`EngineError`])

pub mod backend;
pub mod chunk;
pub mod crypto;
pub mod engine;
pub mod error;

pub use backend::ChunkBackend;
pub use chunk::{chunk_count, split_payload};
pub use crypto::{CipherAlgorithm, EncryptionConfig, EncryptionKey};
pub use engine::{ChunkStore, EngineConfig};
pub use error::{BackendError, EngineError, Result};

/// Default maximum concurrent in-flight chunk operations
pub const DEFAULT_CONNECTIONS: usize = 8;

/// Default bytes per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
