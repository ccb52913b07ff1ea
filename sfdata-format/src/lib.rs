//! SfData Format - Core primitives for SfData documents
//!
//! This crate provides the document model and the fundamental encoding
//! utilities for the SfData container with no I/O dependencies. It includes:
//!
//! - The dynamic [`Value`] document tree
//! - Magic numbers and constants
//! - Variable-length integer encoding (ULEB128/ZigZag)
//! - CRC-32 checksums
//! - Error types
//! - Decode limits
//! - Container header and chunk descriptor table layouts
//! - Binary tree node tags

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::Deserialize;

pub mod checksum;
pub mod constants;
pub mod descriptor;
pub mod error;
pub mod header;
pub mod limits;
pub mod types;
pub mod value;
pub mod varint;

// Re-export commonly used types
pub use descriptor::{ChunkDescriptor, DescriptorTable};
pub use error::{Result, SfError};
pub use header::ContainerHeader;
pub use limits::Limits;
pub use types::TypeTag;
pub use value::{Map, Value, ValueKind};

/// Chunk compression options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase", tag = "algorithm", content = "level")]
pub enum Compression {
    /// Zstandard compression with specified level (1-22)
    Zstd(u8),
    /// Deflate compression with specified level (0-9)
    Deflate(u8),
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Zstd(6)
    }
}

impl Compression {
    /// Get the compressor ID for this option
    pub fn compressor_id(&self) -> u8 {
        match self {
            Compression::Zstd(_) => constants::COMPRESSOR_ZSTD,
            Compression::Deflate(_) => constants::COMPRESSOR_DEFLATE,
        }
    }

    /// Get the compression level for this option
    pub fn level(&self) -> u8 {
        match self {
            Compression::Zstd(level) | Compression::Deflate(level) => *level,
        }
    }

    /// Resolve a compressor ID read from a container header
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            constants::COMPRESSOR_ZSTD => Ok(Compression::Zstd(6)),
            constants::COMPRESSOR_DEFLATE => Ok(Compression::Deflate(6)),
            other => Err(SfError::UnsupportedCompression(other)),
        }
    }

    /// Human-readable algorithm name
    pub fn name(&self) -> &'static str {
        match self {
            Compression::Zstd(_) => "zstd",
            Compression::Deflate(_) => "deflate",
        }
    }
}
