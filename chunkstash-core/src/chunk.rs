//! Payload splitting
//!
//! A payload is split into an ordered sequence of chunks of at most
//! `chunk_size` bytes, strictly increasing offsets, covering the payload
//! exactly once with no overlap and no gap. Two boundary decisions:
//!
//! - a zero-length payload yields exactly one empty chunk, so storing it
//!   still produces a key list that round-trips;
//! - a payload whose length is an exact multiple of `chunk_size` does NOT
//!   produce a trailing empty chunk.

use bytes::Bytes;

/// Number of chunks a payload of `len` bytes splits into
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    if len == 0 {
        1
    } else {
        len.div_ceil(chunk_size)
    }
}

/// Split a payload into chunks of at most `chunk_size` bytes
///
/// Slices share the underlying buffer; no payload bytes are copied.
/// `chunk_size` must be positive (enforced at engine construction).
pub fn split_payload(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    if data.is_empty() {
        return vec![Bytes::new()];
    }

    let mut parts = Vec::with_capacity(chunk_count(data.len(), chunk_size));
    let mut offset = 0;
    while offset < data.len() {
        let end = usize::min(offset + chunk_size, data.len());
        parts.push(data.slice(offset..end));
        offset = end;
    }
    parts
}
