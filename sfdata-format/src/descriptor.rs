//! Chunk descriptor table structures

use crate::constants::{DESCRIPTOR_COUNT_LEN, DESCRIPTOR_ENTRY_LEN};
use crate::error::{Result, SfError};

/// Per-chunk record written after the compressed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Compressed length in bytes
    pub compressed_len: u32,
    /// Uncompressed length in bytes
    pub raw_len: u32,
    /// CRC-32 of the uncompressed bytes
    pub checksum: u32,
}

/// Flat table of chunk descriptors in payload order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorTable {
    /// Descriptor entries
    pub entries: Vec<ChunkDescriptor>,
}

impl DescriptorTable {
    /// Encoded size of a table holding `count` entries
    pub fn encoded_len(count: usize) -> usize {
        DESCRIPTOR_COUNT_LEN + count * DESCRIPTOR_ENTRY_LEN
    }

    /// Encode descriptor table to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.entries.len())
            .map_err(|_| SfError::LimitExceeded("too many chunks".to_string()))?;

        let mut out = Vec::with_capacity(Self::encoded_len(self.entries.len()));
        out.extend_from_slice(&count.to_le_bytes());
        for entry in &self.entries {
            out.extend_from_slice(&entry.compressed_len.to_le_bytes());
            out.extend_from_slice(&entry.raw_len.to_le_bytes());
            out.extend_from_slice(&entry.checksum.to_le_bytes());
        }
        Ok(out)
    }

    /// Decode descriptor table from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DESCRIPTOR_COUNT_LEN {
            return Err(SfError::TruncatedInput);
        }
        let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let body = &bytes[DESCRIPTOR_COUNT_LEN..];
        if body.len() / DESCRIPTOR_ENTRY_LEN < count {
            return Err(SfError::TruncatedInput);
        }

        let entries = body
            .chunks_exact(DESCRIPTOR_ENTRY_LEN)
            .take(count)
            .map(|raw| {
                let word =
                    |i: usize| u32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);
                ChunkDescriptor {
                    compressed_len: word(0),
                    raw_len: word(4),
                    checksum: word(8),
                }
            })
            .collect();

        Ok(Self { entries })
    }

    /// Sum of raw lengths across all chunks
    pub fn total_raw_len(&self) -> u64 {
        self.entries.iter().map(|e| e.raw_len as u64).sum()
    }

    /// Sum of compressed lengths across all chunks
    pub fn total_compressed_len(&self) -> u64 {
        self.entries.iter().map(|e| e.compressed_len as u64).sum()
    }
}
