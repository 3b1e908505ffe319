//! Error types for chunkstash
//!
//! Two layers of errors mirror the two layers of the crate:
//! `BackendError` is what a backend produces, `EngineError` is what the
//! engine surfaces to callers, wrapping backend failures with the
//! position of the chunk that failed.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by a chunk backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("chunk not found: {0}")]
    NotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the chunked store engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("failed to store chunk {index}: {source}")]
    ChunkStore {
        index: usize,
        #[source]
        source: BackendError,
    },

    #[error("failed to fetch chunk {index}: {source}")]
    ChunkFetch {
        index: usize,
        #[source]
        source: BackendError,
    },

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// The index of the chunk that caused this error, if any
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            EngineError::ChunkStore { index, .. } | EngineError::ChunkFetch { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}
