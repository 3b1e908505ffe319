//! Concrete chunk backends for chunkstash
//!
//! - [`MemoryBackend`] for tests and development
//! - [`DirBackend`] for one-file-per-chunk local storage

pub mod dir;
pub mod memory;

pub use dir::DirBackend;
pub use memory::MemoryBackend;
