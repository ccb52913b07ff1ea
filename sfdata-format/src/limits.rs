//! Decode limits and configuration

use serde::Deserialize;

/// Limits applied while decoding untrusted input, to stop decompression bombs
/// and runaway recursion
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum raw bytes per chunk (default: 1 GiB)
    pub max_chunk_size: u32,
    /// Maximum number of chunks in one container (default: 1,048,576)
    pub max_chunk_count: u32,
    /// Maximum total raw length of a container (default: 64 GiB)
    pub max_total_raw_len: u64,
    /// Maximum nesting depth of objects/arrays (default: 512)
    pub max_nesting_depth: usize,
    /// Maximum UTF-8 length of a single string or key (default: 256 MiB)
    pub max_string_len: usize,
    /// Maximum entries in a single object or array (default: 64 Mi)
    pub max_container_entries: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_chunk_size: 1024 * 1024 * 1024,
            max_chunk_count: 1 << 20,
            max_total_raw_len: 64 * 1024 * 1024 * 1024,
            max_nesting_depth: 512,
            max_string_len: 256 * 1024 * 1024,
            max_container_entries: 64 * 1024 * 1024,
        }
    }
}
