//! Constants and magic numbers for the SFDS container and tree encoding

/// Container magic number, stored little-endian (bytes `53 44 46 53`).
pub const CONTAINER_MAGIC: u32 = 0x5346_4453;

/// Container format version understood by this crate.
pub const CONTAINER_VERSION: u8 = 1;

/// Fixed header length in bytes:
/// magic(4) version(1) flags(1) compression(1) chunk size(4) chunk count(4)
/// total raw(8) descriptor offset(8) descriptor length(8) checksum(4).
pub const HEADER_LEN: usize = 43;

/// Length of one descriptor table entry: compressed(4) raw(4) checksum(4).
pub const DESCRIPTOR_ENTRY_LEN: usize = 12;

/// Length of the descriptor table entry-count prefix.
pub const DESCRIPTOR_COUNT_LEN: usize = 4;

/// Default raw bytes buffered per chunk (64 MiB).
pub const DEFAULT_CHUNK_SIZE: u32 = 64 * 1024 * 1024;

/// Compressor ID for the preferred algorithm (Zstandard).
pub const COMPRESSOR_ZSTD: u8 = 1;
/// Compressor ID for the fallback algorithm (raw Deflate).
pub const COMPRESSOR_DEFLATE: u8 = 2;

/// Flag: every chunk carries a checksum in the descriptor table.
pub const FLAG_CHUNK_CHECKSUMS: u8 = 1 << 0;

/// Tree tag for an absent value.
pub const TAG_NONE: u8 = 0x00;
/// Tree tag for a UTF-8 string.
pub const TAG_STRING: u8 = 0x01;
/// Tree tag for a zigzag varint integer.
pub const TAG_INT: u8 = 0x02;
/// Tree tag for a little-endian IEEE-754 double.
pub const TAG_DOUBLE: u8 = 0x03;
/// Tree tag for a boolean byte.
pub const TAG_BOOLEAN: u8 = 0x04;
/// Tree tag for an object (count + key/value pairs).
pub const TAG_OBJECT: u8 = 0x10;
/// Tree tag for an array (count + elements).
pub const TAG_ARRAY: u8 = 0x11;
