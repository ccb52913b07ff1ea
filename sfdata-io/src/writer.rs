//! Container write path
//!
//! Layout on the sink: placeholder header, compressed chunks back to back,
//! descriptor table, then the header is rewritten in place with real values.

use std::io::{Seek, SeekFrom, Write};

use sfdata_codec::compress::resolve;
use sfdata_codec::tree;
use sfdata_format::constants::{CONTAINER_VERSION, FLAG_CHUNK_CHECKSUMS, HEADER_LEN};
use sfdata_format::{Compression, ContainerHeader, Result, SfError, Value};

use crate::chunked::ChunkedCompressor;
use crate::progress::ProgressObserver;
use crate::ContainerOptions;

/// What a save produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// Number of chunks written
    pub chunk_count: u32,
    /// Encoded tree length before compression
    pub total_raw_len: u64,
    /// Sum of compressed chunk lengths
    pub compressed_len: u64,
    /// Descriptor table offset relative to the header
    pub descriptor_offset: u64,
    /// Algorithm actually used, after fallback
    pub compression: Compression,
}

impl WriteSummary {
    /// Total container length in bytes
    pub fn container_len(&self) -> u64 {
        self.descriptor_offset
            + sfdata_format::DescriptorTable::encoded_len(self.chunk_count as usize) as u64
    }
}

/// Write `value` as one container at the sink's current position.
///
/// If this fails after the placeholder is written, the sink is left holding a
/// header that never validates.
pub fn write_container<W: Write + Seek>(
    value: &Value,
    sink: &mut W,
    options: &ContainerOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<WriteSummary> {
    let compression = resolve(options.compression);
    let chunk_size = options.chunk_size_bytes;
    let start = sink.stream_position()?;

    sink.write_all(&ContainerHeader::placeholder(
        compression.compressor_id(),
        chunk_size,
    ))?;

    let total_hint = tree::encoded_len(value);
    tracing::debug!(
        total_raw_len = total_hint,
        chunk_size,
        compression = compression.name(),
        level = compression.level(),
        "writing container"
    );

    let mut compressor =
        ChunkedCompressor::new(&mut *sink, compression, chunk_size, total_hint, observer)?;
    tree::encode(value, &mut compressor)?;
    let (_, table) = compressor.finish()?;

    let chunk_count = u32::try_from(table.entries.len())
        .map_err(|_| SfError::LimitExceeded("too many chunks".to_string()))?;
    let compressed_len = table.total_compressed_len();
    let descriptor_offset = HEADER_LEN as u64 + compressed_len;
    let table_bytes = table.encode()?;
    sink.write_all(&table_bytes)?;
    let end = sink.stream_position()?;

    let header = ContainerHeader {
        version: CONTAINER_VERSION,
        flags: FLAG_CHUNK_CHECKSUMS,
        compression_id: compression.compressor_id(),
        chunk_size,
        chunk_count,
        total_raw_len: table.total_raw_len(),
        descriptor_offset,
        descriptor_len: table_bytes.len() as u64,
    };
    sink.seek(SeekFrom::Start(start))?;
    sink.write_all(&header.encode())?;
    sink.seek(SeekFrom::Start(end))?;
    sink.flush()?;

    tracing::debug!(
        chunk_count,
        total_raw_len = header.total_raw_len,
        compressed_len,
        "container written"
    );

    Ok(WriteSummary {
        chunk_count,
        total_raw_len: header.total_raw_len,
        compressed_len,
        descriptor_offset,
        compression,
    })
}
