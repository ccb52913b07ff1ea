//! Chunk-level streaming between the tree codec and the container payload
//!
//! [`ChunkedCompressor`] is the write-side sink: tree bytes go in, full chunks
//! are compressed and appended to the payload as soon as they fill.
//! [`ChunkStream`] is the read-side source: chunks are decompressed and
//! verified one at a time as the tree decoder asks for bytes.

use std::io::{self, Read, Write};

use sfdata_codec::compress::{compress_chunk, decompress_chunk};
use sfdata_format::checksum::compute_crc32;
use sfdata_format::{ChunkDescriptor, Compression, DescriptorTable, Result, SfError};

use crate::progress::{Progress, ProgressObserver, STAGE_COMPRESS, STAGE_DECOMPRESS};

/// Buffers raw bytes and emits one compressed chunk per `chunk_size` bytes.
///
/// Peak memory is one raw chunk plus its compressed form.
pub struct ChunkedCompressor<'p, W: Write> {
    sink: W,
    compression: Compression,
    chunk_size: usize,
    buffer: Vec<u8>,
    descriptors: Vec<ChunkDescriptor>,
    raw_written: u64,
    total_hint: u64,
    observer: &'p mut dyn ProgressObserver,
}

impl<'p, W: Write> ChunkedCompressor<'p, W> {
    /// Create a compressor writing chunks to `sink`.
    ///
    /// `total_hint` is the expected raw length and only feeds progress
    /// reports and the initial buffer reservation.
    pub fn new(
        sink: W,
        compression: Compression,
        chunk_size: u32,
        total_hint: u64,
        observer: &'p mut dyn ProgressObserver,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SfError::LimitExceeded(
                "chunk size must be at least one byte".to_string(),
            ));
        }
        let chunk_size = chunk_size as usize;
        let reserve = usize::try_from(total_hint).unwrap_or(usize::MAX).min(chunk_size);
        Ok(Self {
            sink,
            compression,
            chunk_size,
            buffer: Vec::with_capacity(reserve),
            descriptors: Vec::new(),
            raw_written: 0,
            total_hint,
            observer,
        })
    }

    /// Raw bytes accepted so far, including the unflushed buffer
    pub fn raw_len(&self) -> u64 {
        self.raw_written + self.buffer.len() as u64
    }

    /// Compress whatever is buffered into a chunk, if anything
    pub fn flush_chunk(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let checksum = compute_crc32(&self.buffer);
        let compressed = compress_chunk(&self.buffer, self.compression)?;
        let compressed_len = u32::try_from(compressed.len()).map_err(|_| {
            SfError::LimitExceeded(format!(
                "compressed chunk of {} bytes does not fit the descriptor table",
                compressed.len()
            ))
        })?;
        self.sink.write_all(&compressed)?;

        let descriptor = ChunkDescriptor {
            compressed_len,
            // buffer never exceeds chunk_size, which came from a u32
            raw_len: self.buffer.len() as u32,
            checksum,
        };
        tracing::debug!(
            index = self.descriptors.len(),
            raw_len = descriptor.raw_len,
            compressed_len = descriptor.compressed_len,
            "chunk written"
        );
        self.descriptors.push(descriptor);
        self.raw_written += self.buffer.len() as u64;
        self.buffer.clear();

        let total = self.total_hint.max(self.raw_written);
        self.observer
            .on_progress(&Progress::new(STAGE_COMPRESS, self.raw_written, total));
        Ok(())
    }

    /// Flush the trailing partial chunk and hand back the sink and descriptors
    pub fn finish(mut self) -> Result<(W, DescriptorTable)> {
        self.flush_chunk()?;
        Ok((
            self.sink,
            DescriptorTable {
                entries: self.descriptors,
            },
        ))
    }
}

impl<W: Write> Write for ChunkedCompressor<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.chunk_size - self.buffer.len();
        let take = room.min(buf.len());
        self.buffer.extend_from_slice(&buf[..take]);
        if self.buffer.len() == self.chunk_size {
            self.flush_chunk().map_err(SfError::into_io)?;
        }
        Ok(take)
    }

    /// An explicit flush closes the current chunk early.
    fn flush(&mut self) -> io::Result<()> {
        self.flush_chunk().map_err(SfError::into_io)?;
        self.sink.flush()
    }
}

/// Sequential reader over the chunks of one container payload.
///
/// The source must be positioned at the first chunk. Without recovery, a
/// checksum mismatch or codec failure stops the read; with recovery the
/// damaged chunk is patched to its declared length and recorded.
pub struct ChunkStream<'p, R: Read> {
    source: R,
    compressor_id: u8,
    verify_checksums: bool,
    allow_recovery: bool,
    descriptors: Vec<ChunkDescriptor>,
    next_chunk: usize,
    current: Vec<u8>,
    pos: usize,
    raw_read: u64,
    total_raw: u64,
    corrupt_chunks: Vec<usize>,
    observer: &'p mut dyn ProgressObserver,
}

impl<'p, R: Read> ChunkStream<'p, R> {
    /// Create a stream over `table`'s chunks compressed with `compressor_id`
    pub fn new(
        source: R,
        compressor_id: u8,
        table: DescriptorTable,
        verify_checksums: bool,
        allow_recovery: bool,
        observer: &'p mut dyn ProgressObserver,
    ) -> Self {
        let total_raw = table.total_raw_len();
        Self {
            source,
            compressor_id,
            verify_checksums,
            allow_recovery,
            descriptors: table.entries,
            next_chunk: 0,
            current: Vec::new(),
            pos: 0,
            raw_read: 0,
            total_raw,
            corrupt_chunks: Vec::new(),
            observer,
        }
    }

    /// Indices of chunks that failed verification and were patched
    pub fn corrupt_chunks(&self) -> &[usize] {
        &self.corrupt_chunks
    }

    /// Verify every chunk the consumer did not read.
    ///
    /// Returns the number of raw bytes that were never consumed.
    pub fn drain(&mut self) -> Result<u64> {
        let mut unread = (self.current.len() - self.pos) as u64;
        self.pos = self.current.len();
        while self.load_next_chunk()? {
            unread += self.current.len() as u64;
            self.pos = self.current.len();
        }
        Ok(unread)
    }

    /// Consume the stream, returning the source and the corrupt chunk list
    pub fn into_parts(self) -> (R, Vec<usize>) {
        (self.source, self.corrupt_chunks)
    }

    fn load_next_chunk(&mut self) -> Result<bool> {
        let Some(descriptor) = self.descriptors.get(self.next_chunk).copied() else {
            return Ok(false);
        };
        let index = self.next_chunk;
        self.next_chunk += 1;

        let mut compressed = Vec::new();
        (&mut self.source)
            .take(descriptor.compressed_len as u64)
            .read_to_end(&mut compressed)?;
        if compressed.len() != descriptor.compressed_len as usize {
            return Err(SfError::TruncatedInput);
        }

        let raw_len = descriptor.raw_len as usize;
        let mut raw = match decompress_chunk(&compressed, self.compressor_id, raw_len) {
            Ok(raw) => raw,
            Err(SfError::DecompressError(reason)) if self.allow_recovery => {
                tracing::warn!(
                    index,
                    error = %reason,
                    "chunk failed to decompress, substituting zeros"
                );
                self.corrupt_chunks.push(index);
                vec![0u8; raw_len]
            }
            // damaged compressed bytes are chunk corruption; no output to checksum
            Err(SfError::DecompressError(reason)) => {
                tracing::debug!(index, error = %reason, "chunk failed to decompress");
                return Err(SfError::ChunkCorrupt {
                    index,
                    expected: descriptor.checksum,
                    actual: 0,
                });
            }
            Err(err) => return Err(err),
        };

        let already_patched = self.corrupt_chunks.last() == Some(&index);
        if self.verify_checksums && !already_patched {
            let actual = compute_crc32(&raw);
            if raw.len() != raw_len || actual != descriptor.checksum {
                if !self.allow_recovery {
                    return Err(SfError::ChunkCorrupt {
                        index,
                        expected: descriptor.checksum,
                        actual,
                    });
                }
                tracing::warn!(
                    index,
                    expected = descriptor.checksum,
                    actual,
                    "chunk checksum mismatch, keeping decompressed bytes"
                );
                self.corrupt_chunks.push(index);
                raw.resize(raw_len, 0);
            }
        }

        self.raw_read += raw_len as u64;
        tracing::debug!(index, raw_len, "chunk read");
        self.observer.on_progress(&Progress::new(
            STAGE_DECOMPRESS,
            self.raw_read,
            self.total_raw,
        ));

        self.current = raw;
        self.pos = 0;
        Ok(true)
    }
}

impl<R: Read> Read for ChunkStream<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos == self.current.len() {
            if !self.load_next_chunk().map_err(SfError::into_io)? {
                return Ok(0);
            }
        }
        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
