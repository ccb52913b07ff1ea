//! Negative container tests covering the `SfError` variants of the read and write paths

use sfdata_format::checksum::compute_crc32;
use sfdata_format::constants::{
    COMPRESSOR_DEFLATE, CONTAINER_VERSION, FLAG_CHUNK_CHECKSUMS, HEADER_LEN, TAG_STRING,
};
use sfdata_format::{ChunkDescriptor, ContainerHeader, DescriptorTable};
use sfdata_io::chunked::ChunkedCompressor;
use sfdata_io::{
    load_from_file, load_from_stream, load_from_stream_detailed, save_to_stream, Compression,
    ContainerOptions, Limits, NoProgress, SfError, Value,
};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::ops::Range;

fn deflate_options(chunk_size: u32) -> ContainerOptions {
    ContainerOptions {
        chunk_size_bytes: chunk_size,
        compression: Compression::Deflate(6),
        ..ContainerOptions::default()
    }
}

fn sample_container() -> Vec<u8> {
    let mut doc = Value::None;
    for i in 0..50 {
        doc.entry_mut("values").unwrap().push(i).unwrap();
    }
    let mut cursor = Cursor::new(Vec::new());
    save_to_stream(&doc, &mut cursor, &deflate_options(64)).unwrap();
    cursor.into_inner()
}

/// Wrap arbitrary raw bytes in a well-formed container
fn container_from_raw(raw: &[u8], chunk_size: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    let mut observer = NoProgress;
    let mut compressor = ChunkedCompressor::new(
        &mut payload,
        Compression::Deflate(6),
        chunk_size,
        raw.len() as u64,
        &mut observer,
    )
    .unwrap();
    compressor.write_all(raw).unwrap();
    let (_, table) = compressor.finish().unwrap();

    let table_bytes = table.encode().unwrap();
    let header = ContainerHeader {
        version: CONTAINER_VERSION,
        flags: FLAG_CHUNK_CHECKSUMS,
        compression_id: COMPRESSOR_DEFLATE,
        chunk_size,
        chunk_count: table.entries.len() as u32,
        total_raw_len: table.total_raw_len(),
        descriptor_offset: (HEADER_LEN + payload.len()) as u64,
        descriptor_len: table_bytes.len() as u64,
    };

    let mut bytes = header.encode().to_vec();
    bytes.extend(payload);
    bytes.extend(table_bytes);
    bytes
}

fn rewrite_header(bytes: &mut [u8], edit: impl FnOnce(&mut ContainerHeader)) {
    let mut header = ContainerHeader::decode(&bytes[..HEADER_LEN]).unwrap();
    edit(&mut header);
    bytes[..HEADER_LEN].copy_from_slice(&header.encode());
}

fn load(bytes: Vec<u8>) -> sfdata_io::Result<Value> {
    load_from_stream(&mut Cursor::new(bytes), &ContainerOptions::default())
}

#[test]
fn test_bad_magic() {
    let mut bytes = sample_container();
    bytes[0] = b'X';
    assert!(matches!(load(bytes), Err(SfError::BadMagic(_))));
}

#[test]
fn test_version_mismatch() {
    let mut bytes = sample_container();
    bytes[4] = CONTAINER_VERSION + 1;
    match load(bytes) {
        Err(SfError::VersionMismatch(v)) => assert_eq!(v, CONTAINER_VERSION + 1),
        other => panic!("expected VersionMismatch, got {other:?}"),
    }
}

#[test]
fn test_header_checksum_mismatch() {
    let mut bytes = sample_container();
    bytes[12] ^= 0x01;
    assert!(matches!(load(bytes), Err(SfError::CorruptHeader)));
}

#[test]
fn test_empty_and_short_inputs_are_truncated() {
    assert!(matches!(load(Vec::new()), Err(SfError::TruncatedInput)));
    let bytes = sample_container();
    assert!(matches!(
        load(bytes[..HEADER_LEN - 3].to_vec()),
        Err(SfError::TruncatedInput)
    ));
}

#[test]
fn test_truncated_payload() {
    let bytes = sample_container();
    for cut in [HEADER_LEN, HEADER_LEN + 10, bytes.len() - 1] {
        assert!(
            matches!(load(bytes[..cut].to_vec()), Err(SfError::TruncatedInput)),
            "cut at {cut}"
        );
    }
}

#[test]
fn test_unsupported_compression_id() {
    let mut bytes = sample_container();
    rewrite_header(&mut bytes, |h| h.compression_id = 9);
    assert!(matches!(load(bytes), Err(SfError::UnsupportedCompression(9))));
}

#[test]
fn test_descriptor_table_disagrees_with_header() {
    let mut bytes = sample_container();
    rewrite_header(&mut bytes, |h| h.total_raw_len += 1);
    assert!(matches!(load(bytes), Err(SfError::CorruptDescriptorTable(_))));

    let mut bytes = sample_container();
    rewrite_header(&mut bytes, |h| h.descriptor_len += 12);
    assert!(matches!(load(bytes), Err(SfError::CorruptDescriptorTable(_))));

    let mut bytes = sample_container();
    rewrite_header(&mut bytes, |h| h.descriptor_offset = 8);
    assert!(matches!(load(bytes), Err(SfError::CorruptDescriptorTable(_))));
}

#[test]
fn test_descriptor_checksum_tampering() {
    let mut bytes = sample_container();
    let header = ContainerHeader::decode(&bytes[..HEADER_LEN]).unwrap();
    let at = header.descriptor_offset as usize + 4 + 8;
    bytes[at] ^= 0xFF;

    match load(bytes.clone()) {
        Err(SfError::ChunkCorrupt { index, .. }) => assert_eq!(index, 0),
        other => panic!("expected ChunkCorrupt, got {other:?}"),
    }

    let lenient = ContainerOptions {
        allow_recovery: true,
        ..ContainerOptions::default()
    };
    let outcome =
        load_from_stream_detailed(&mut Cursor::new(bytes), &lenient, &mut NoProgress).unwrap();
    assert_eq!(outcome.corrupt_chunks, vec![0]);
    assert!(!outcome.salvaged);
    assert_eq!(outcome.value.get("values").len(), 50);
}

#[test]
fn test_placeholder_from_aborted_write() {
    let mut bytes = ContainerHeader::placeholder(COMPRESSOR_DEFLATE, 1024).to_vec();
    bytes.extend_from_slice(&[0xAB; 100]);
    assert!(matches!(load(bytes), Err(SfError::CorruptHeader)));
}

#[test]
fn test_invalid_tree_is_not_masked_by_recovery() {
    let bytes = container_from_raw(&[0x7F, 0x00], 1);
    assert!(matches!(load(bytes.clone()), Err(SfError::InvalidTag(0x7F))));

    let lenient = ContainerOptions {
        allow_recovery: true,
        ..ContainerOptions::default()
    };
    assert!(matches!(
        load_from_stream(&mut Cursor::new(bytes), &lenient),
        Err(SfError::InvalidTag(0x7F))
    ));
}

#[test]
fn test_tree_running_past_payload_is_truncated() {
    let bytes = container_from_raw(&[TAG_STRING, 10, b'a', b'b'], 2);
    assert!(matches!(load(bytes), Err(SfError::TruncatedInput)));
}

#[test]
fn test_trailing_raw_bytes_after_tree_are_verified_and_ignored() {
    let mut raw = vec![TAG_STRING, 2, b'o', b'k'];
    raw.extend_from_slice(&[0xEE; 37]);
    let bytes = container_from_raw(&raw, 8);
    assert_eq!(load(bytes.clone()).unwrap(), Value::from("ok"));

    // damage the final chunk, which the tree decoder never reads
    let header = ContainerHeader::decode(&bytes[..HEADER_LEN]).unwrap();
    let mut tampered = bytes;
    let last_entry = header.descriptor_offset as usize + 4 + 12 * (header.chunk_count as usize - 1);
    let last_checksum = last_entry + 8;
    tampered[last_checksum] ^= 0x01;
    assert!(matches!(load(tampered), Err(SfError::ChunkCorrupt { .. })));
}

#[test]
fn test_limits_reject_oversized_chunks() {
    let bytes = sample_container();
    let options = ContainerOptions {
        limits: Limits {
            max_chunk_size: 16,
            ..Limits::default()
        },
        ..ContainerOptions::default()
    };
    assert!(matches!(
        load_from_stream(&mut Cursor::new(bytes), &options),
        Err(SfError::LimitExceeded(_))
    ));
}

#[test]
fn test_lying_raw_length_is_bounded() {
    // a descriptor claiming fewer raw bytes than the chunk holds
    let mut bytes = container_from_raw(&[TAG_STRING, 3, b'a', b'b', b'c'], 64);
    let header = ContainerHeader::decode(&bytes[..HEADER_LEN]).unwrap();
    let table_at = header.descriptor_offset as usize;
    let mut table = DescriptorTable::decode(&bytes[table_at..]).unwrap();
    table.entries[0] = ChunkDescriptor {
        raw_len: 2,
        checksum: compute_crc32(&[TAG_STRING, 3]),
        ..table.entries[0]
    };
    bytes[table_at..].copy_from_slice(&table.encode().unwrap());
    rewrite_header(&mut bytes, |h| h.total_raw_len = 2);

    match load(bytes) {
        Err(SfError::ChunkCorrupt {
            index: 0, actual: 0, ..
        }) => {}
        other => panic!("expected ChunkCorrupt, got {other:?}"),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    match load_from_file(dir.path().join("nope.sfds"), &ContainerOptions::default()) {
        Err(SfError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
        other => panic!("expected Io, got {other:?}"),
    }
}

/// Source whose reads inside `failing` fail, or end early when `ends` is set
struct FailingSource {
    inner: Cursor<Vec<u8>>,
    failing: Range<u64>,
    ends: bool,
}

impl Read for FailingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.inner.position();
        if self.failing.contains(&pos) {
            if self.ends {
                return Ok(0);
            }
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        let len = if pos < self.failing.start {
            buf.len().min((self.failing.start - pos) as usize)
        } else {
            buf.len()
        };
        self.inner.read(&mut buf[..len])
    }
}

impl Seek for FailingSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn test_source_io_errors_propagate_even_with_recovery() {
    let bytes = sample_container();
    let header = ContainerHeader::decode(&bytes[..HEADER_LEN]).unwrap();
    // header and descriptor table stay readable, chunk bodies do not
    let mut source = FailingSource {
        inner: Cursor::new(bytes),
        failing: HEADER_LEN as u64..header.descriptor_offset,
        ends: false,
    };
    let lenient = ContainerOptions {
        allow_recovery: true,
        ..ContainerOptions::default()
    };
    match load_from_stream(&mut source, &lenient) {
        Err(SfError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::PermissionDenied),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn test_short_chunk_after_salvage_keeps_partial_tree() {
    let doc = Value::from(vec![Value::from(0); 100]);
    let raw = sfdata_codec::tree::encode_to_vec(&doc).unwrap();
    let options = ContainerOptions {
        chunk_size_bytes: 20,
        compression: Compression::Deflate(0),
        allow_recovery: true,
        ..ContainerOptions::default()
    };
    let mut cursor = Cursor::new(Vec::new());
    save_to_stream(&doc, &mut cursor, &options).unwrap();
    let mut bytes = cursor.into_inner();

    // stored deflate keeps chunk 1 verbatim; break the element tag it starts with
    let at = bytes
        .windows(20)
        .position(|w| w == &raw[20..40])
        .unwrap();
    bytes[at] = 0x7F;

    // chunk 5 onwards ends early, so verifying the rest of the payload fails
    let header = ContainerHeader::decode(&bytes[..HEADER_LEN]).unwrap();
    let table = DescriptorTable::decode(&bytes[header.descriptor_offset as usize..]).unwrap();
    let chunk_5 = HEADER_LEN as u64
        + table.entries[..5]
            .iter()
            .map(|d| d.compressed_len as u64)
            .sum::<u64>();
    let mut source = FailingSource {
        inner: Cursor::new(bytes),
        failing: chunk_5..header.descriptor_offset,
        ends: true,
    };

    let outcome = load_from_stream_detailed(&mut source, &options, &mut NoProgress).unwrap();
    assert!(outcome.salvaged);
    assert_eq!(outcome.corrupt_chunks, vec![1]);
    assert_eq!(outcome.value.len(), 9);
}

/// Sink that stops accepting bytes after `capacity`
struct FullDisk {
    inner: Cursor<Vec<u8>>,
    capacity: u64,
}

impl Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.inner.position() + buf.len() as u64 > self.capacity {
            return Err(io::Error::other("disk full"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FullDisk {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn test_failed_write_leaves_undecodable_placeholder() {
    let doc = Value::from(vec![Value::from("payload"); 200]);
    let mut sink = FullDisk {
        inner: Cursor::new(Vec::new()),
        capacity: HEADER_LEN as u64 + 32,
    };
    match save_to_stream(&doc, &mut sink, &deflate_options(16)) {
        Err(SfError::Io(err)) => assert_eq!(err.to_string(), "disk full"),
        other => panic!("expected Io, got {other:?}"),
    }
    assert!(matches!(
        load(sink.inner.into_inner()),
        Err(SfError::CorruptHeader)
    ));
}
