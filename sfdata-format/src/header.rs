//! Container header structures

use crate::checksum::compute_crc32;
use crate::constants::{
    CONTAINER_MAGIC, CONTAINER_VERSION, DEFAULT_CHUNK_SIZE, FLAG_CHUNK_CHECKSUMS, HEADER_LEN,
};
use crate::error::{Result, SfError};

/// Fixed-layout container header.
///
/// Written twice: a placeholder before the payload and the real values once
/// every length is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Format version
    pub version: u8,
    /// Flag bits
    pub flags: u8,
    /// Compressor ID used for every chunk
    pub compression_id: u8,
    /// Configured raw bytes per chunk
    pub chunk_size: u32,
    /// Number of chunks in the payload
    pub chunk_count: u32,
    /// Sum of the raw lengths of all chunks
    pub total_raw_len: u64,
    /// Descriptor table offset, relative to the start of the header
    pub descriptor_offset: u64,
    /// Descriptor table length in bytes
    pub descriptor_len: u64,
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self {
            version: CONTAINER_VERSION,
            flags: FLAG_CHUNK_CHECKSUMS,
            compression_id: crate::constants::COMPRESSOR_ZSTD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_count: 0,
            total_raw_len: 0,
            descriptor_offset: 0,
            descriptor_len: 0,
        }
    }
}

impl ContainerHeader {
    /// Encode the header, computing its checksum
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = self.encode_fields();
        let crc = compute_crc32(&out[..HEADER_LEN - 4]);
        out[HEADER_LEN - 4..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Encode a placeholder that reserves space before the payload.
    ///
    /// Lengths and the checksum are zero, so the placeholder never validates.
    pub fn placeholder(compression_id: u8, chunk_size: u32) -> [u8; HEADER_LEN] {
        Self {
            compression_id,
            chunk_size,
            ..Self::default()
        }
        .encode_fields()
    }

    fn encode_fields(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut pos = 0;
        let mut put = |bytes: &[u8]| {
            out[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        };

        put(&CONTAINER_MAGIC.to_le_bytes());
        put(&[self.version, self.flags, self.compression_id]);
        put(&self.chunk_size.to_le_bytes());
        put(&self.chunk_count.to_le_bytes());
        put(&self.total_raw_len.to_le_bytes());
        put(&self.descriptor_offset.to_le_bytes());
        put(&self.descriptor_len.to_le_bytes());
        // checksum slot stays zero
        out
    }

    /// Decode and validate a header from bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(SfError::TruncatedInput);
        }

        let magic = u32::from_le_bytes(read_array(bytes, 0));
        if magic != CONTAINER_MAGIC {
            return Err(SfError::BadMagic(magic));
        }
        if bytes.len() < HEADER_LEN {
            return Err(SfError::TruncatedInput);
        }

        let version = bytes[4];
        if version != CONTAINER_VERSION {
            return Err(SfError::VersionMismatch(version));
        }

        let stored_crc = u32::from_le_bytes(read_array(bytes, HEADER_LEN - 4));
        if compute_crc32(&bytes[..HEADER_LEN - 4]) != stored_crc {
            return Err(SfError::CorruptHeader);
        }

        Ok(Self {
            version,
            flags: bytes[5],
            compression_id: bytes[6],
            chunk_size: u32::from_le_bytes(read_array(bytes, 7)),
            chunk_count: u32::from_le_bytes(read_array(bytes, 11)),
            total_raw_len: u64::from_le_bytes(read_array(bytes, 15)),
            descriptor_offset: u64::from_le_bytes(read_array(bytes, 23)),
            descriptor_len: u64::from_le_bytes(read_array(bytes, 31)),
        })
    }

    /// Check if chunk checksums flag is set
    pub fn has_chunk_checksums(&self) -> bool {
        self.flags & FLAG_CHUNK_CHECKSUMS != 0
    }
}

fn read_array<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}
