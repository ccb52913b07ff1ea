//! Container read path: header, descriptor table, chunk stream, tree decode

use std::io::{Read, Seek, SeekFrom};

use sfdata_codec::compress::is_available;
use sfdata_codec::tree::{self, Salvage};
use sfdata_format::constants::HEADER_LEN;
use sfdata_format::{
    Compression, ContainerHeader, DescriptorTable, Limits, Result, SfError, Value,
};

use crate::chunked::ChunkStream;
use crate::progress::ProgressObserver;
use crate::ContainerOptions;

/// Validated container metadata, read without touching chunk bodies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Decoded header
    pub header: ContainerHeader,
    /// Descriptor table, cross-checked against the header
    pub descriptors: DescriptorTable,
}

impl ContainerInfo {
    /// Compression algorithm named by the header
    pub fn compression(&self) -> Result<Compression> {
        Compression::from_id(self.header.compression_id)
    }

    /// Total container length in bytes, header included
    pub fn container_len(&self) -> u64 {
        self.header.descriptor_offset + self.header.descriptor_len
    }
}

/// Result of a detailed load
#[derive(Debug)]
pub struct LoadOutcome {
    /// Decoded document
    pub value: Value,
    /// Header the container was written with
    pub header: ContainerHeader,
    /// Chunks that failed verification and were patched (recovery only)
    pub corrupt_chunks: Vec<usize>,
    /// True if decoding stopped early and `value` is a partial tree
    pub salvaged: bool,
}

/// Read and validate the header and descriptor table at the current position.
///
/// On success the source is left just after the descriptor table.
pub fn inspect<R: Read + Seek>(source: &mut R, limits: &Limits) -> Result<ContainerInfo> {
    let start = source.stream_position()?;
    read_info(source, start, limits)
}

fn read_info<R: Read + Seek>(source: &mut R, start: u64, limits: &Limits) -> Result<ContainerInfo> {
    let mut header_bytes = [0u8; HEADER_LEN];
    source.read_exact(&mut header_bytes).map_err(SfError::from_io)?;
    let header = ContainerHeader::decode(&header_bytes)?;

    if !is_available(header.compression_id) {
        return Err(SfError::UnsupportedCompression(header.compression_id));
    }
    if header.chunk_count > limits.max_chunk_count {
        return Err(SfError::LimitExceeded(format!(
            "container declares {} chunks (max {})",
            header.chunk_count, limits.max_chunk_count
        )));
    }
    if header.total_raw_len > limits.max_total_raw_len {
        return Err(SfError::LimitExceeded(format!(
            "container declares {} raw bytes (max {})",
            header.total_raw_len, limits.max_total_raw_len
        )));
    }

    let expected_len = DescriptorTable::encoded_len(header.chunk_count as usize) as u64;
    if header.descriptor_len != expected_len {
        return Err(SfError::CorruptDescriptorTable(format!(
            "table length {} does not match {} chunks",
            header.descriptor_len, header.chunk_count
        )));
    }
    if header.descriptor_offset < HEADER_LEN as u64 {
        return Err(SfError::CorruptDescriptorTable(format!(
            "table offset {} overlaps the header",
            header.descriptor_offset
        )));
    }

    let table_pos = start
        .checked_add(header.descriptor_offset)
        .ok_or_else(|| SfError::CorruptDescriptorTable("table offset overflows".to_string()))?;
    source.seek(SeekFrom::Start(table_pos))?;
    let mut table_bytes = vec![0u8; expected_len as usize];
    source.read_exact(&mut table_bytes).map_err(SfError::from_io)?;
    let descriptors = DescriptorTable::decode(&table_bytes)?;

    validate_table(&header, &descriptors, limits)?;
    tracing::debug!(
        chunks = header.chunk_count,
        total_raw_len = header.total_raw_len,
        compression_id = header.compression_id,
        "container header validated"
    );

    Ok(ContainerInfo {
        header,
        descriptors,
    })
}

fn validate_table(
    header: &ContainerHeader,
    table: &DescriptorTable,
    limits: &Limits,
) -> Result<()> {
    if table.entries.len() != header.chunk_count as usize {
        return Err(SfError::CorruptDescriptorTable(format!(
            "table holds {} entries, header declares {}",
            table.entries.len(),
            header.chunk_count
        )));
    }
    if table.total_raw_len() != header.total_raw_len {
        return Err(SfError::CorruptDescriptorTable(format!(
            "chunks hold {} raw bytes, header declares {}",
            table.total_raw_len(),
            header.total_raw_len
        )));
    }
    if HEADER_LEN as u64 + table.total_compressed_len() != header.descriptor_offset {
        return Err(SfError::CorruptDescriptorTable(
            "compressed lengths do not end at the table offset".to_string(),
        ));
    }
    let max_raw = header.chunk_size.min(limits.max_chunk_size);
    if let Some((index, entry)) = table
        .entries
        .iter()
        .enumerate()
        .find(|(_, entry)| entry.raw_len > max_raw)
    {
        return Err(SfError::LimitExceeded(format!(
            "chunk {} holds {} raw bytes (max {})",
            index, entry.raw_len, max_raw
        )));
    }
    Ok(())
}

/// Decode one container starting at the current position.
///
/// On success the source is left just after the container.
pub fn read_container<R: Read + Seek>(
    source: &mut R,
    options: &ContainerOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<LoadOutcome> {
    let start = source.stream_position()?;
    let ContainerInfo {
        header,
        descriptors,
    } = read_info(source, start, &options.limits)?;
    let end = start + header.descriptor_offset + header.descriptor_len;

    source.seek(SeekFrom::Start(start + HEADER_LEN as u64))?;
    let mut chunks = ChunkStream::new(
        &mut *source,
        header.compression_id,
        descriptors,
        header.has_chunk_checksums(),
        options.allow_recovery,
        observer,
    );

    let (value, salvaged) = if options.allow_recovery {
        let Salvage { value, error } = tree::salvage(&mut chunks, &options.limits);
        match error {
            None => (value, false),
            Some(err @ SfError::Io(_)) => return Err(err),
            Some(err) if chunks.corrupt_chunks().is_empty() => return Err(err),
            Some(err) => {
                tracing::warn!(
                    error = %err,
                    corrupt_chunks = ?chunks.corrupt_chunks(),
                    "tree decode stopped in damaged data, returning partial tree"
                );
                (value, true)
            }
        }
    } else {
        (tree::decode_with_limits(&mut chunks, &options.limits)?, false)
    };

    // after a salvage the source may no longer sit on a chunk boundary
    let unread = match chunks.drain() {
        Ok(unread) => unread,
        Err(err @ SfError::Io(_)) => return Err(err),
        Err(err) if salvaged => {
            tracing::warn!(error = %err, "could not verify chunks after the salvaged tree");
            0
        }
        Err(err) => return Err(err),
    };
    if unread > 0 {
        tracing::debug!(unread, "raw bytes left after the tree");
    }
    let (_, corrupt_chunks) = chunks.into_parts();

    source.seek(SeekFrom::Start(end))?;
    Ok(LoadOutcome {
        value,
        header,
        corrupt_chunks,
        salvaged,
    })
}
