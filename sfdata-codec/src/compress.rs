//! Per-chunk compression
//!
//! Zstandard is the preferred algorithm (compressor ID 1). Deflate (ID 2) is
//! always compiled in and is used when Zstandard is not part of the build.

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use sfdata_format::constants::{COMPRESSOR_DEFLATE, COMPRESSOR_ZSTD};
use sfdata_format::{Compression, Result, SfError};

/// True if chunks tagged with `compressor_id` can be handled by this build
pub fn is_available(compressor_id: u8) -> bool {
    match compressor_id {
        COMPRESSOR_ZSTD => cfg!(feature = "zstd"),
        COMPRESSOR_DEFLATE => true,
        _ => false,
    }
}

/// Map the requested algorithm to one this build can produce
pub fn resolve(requested: Compression) -> Compression {
    match requested {
        Compression::Zstd(level) if !is_available(COMPRESSOR_ZSTD) => {
            let fallback = Compression::Deflate(level.min(9));
            tracing::warn!(
                requested = requested.name(),
                fallback = fallback.name(),
                "preferred compression unavailable, falling back"
            );
            fallback
        }
        Compression::Deflate(level) => Compression::Deflate(level.min(9)),
        other => other,
    }
}

/// Compress one chunk of raw bytes
pub fn compress_chunk(raw: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::Zstd(level) => compress_zstd(raw, level),
        Compression::Deflate(level) => {
            let mut encoder = DeflateEncoder::new(
                Vec::with_capacity(raw.len() / 2 + 64),
                flate2::Compression::new(u32::from(level.min(9))),
            );
            encoder
                .write_all(raw)
                .and_then(|_| encoder.finish())
                .map_err(|e| SfError::Internal(format!("Deflate compression failed: {}", e)))
        }
    }
}

#[cfg(feature = "zstd")]
fn compress_zstd(raw: &[u8], level: u8) -> Result<Vec<u8>> {
    zstd::encode_all(raw, i32::from(level))
        .map_err(|e| SfError::Internal(format!("Zstd compression failed: {}", e)))
}

#[cfg(not(feature = "zstd"))]
fn compress_zstd(_raw: &[u8], _level: u8) -> Result<Vec<u8>> {
    Err(SfError::UnsupportedCompression(COMPRESSOR_ZSTD))
}

/// Decompress one chunk, refusing to produce more than `raw_len` bytes.
///
/// The output may be shorter than `raw_len`; callers compare lengths and
/// checksums themselves.
pub fn decompress_chunk(compressed: &[u8], compressor_id: u8, raw_len: usize) -> Result<Vec<u8>> {
    match compressor_id {
        COMPRESSOR_ZSTD => decompress_zstd(compressed, raw_len),
        COMPRESSOR_DEFLATE => {
            let mut out = Vec::with_capacity(raw_len);
            DeflateDecoder::new(compressed)
                .take(raw_len as u64 + 1)
                .read_to_end(&mut out)
                .map_err(|e| SfError::DecompressError(format!("Deflate: {}", e)))?;
            if out.len() > raw_len {
                return Err(SfError::DecompressError(format!(
                    "Deflate output exceeds declared raw length {raw_len}"
                )));
            }
            Ok(out)
        }
        other => Err(SfError::UnsupportedCompression(other)),
    }
}

#[cfg(feature = "zstd")]
fn decompress_zstd(compressed: &[u8], raw_len: usize) -> Result<Vec<u8>> {
    zstd::bulk::decompress(compressed, raw_len)
        .map_err(|e| SfError::DecompressError(format!("Zstd: {}", e)))
}

#[cfg(not(feature = "zstd"))]
fn decompress_zstd(_compressed: &[u8], _raw_len: usize) -> Result<Vec<u8>> {
    Err(SfError::UnsupportedCompression(COMPRESSOR_ZSTD))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Vec<u8> {
        (0..10_000u32).flat_map(|i| (i % 251).to_le_bytes()).collect()
    }

    #[test]
    fn test_deflate_roundtrip() {
        let raw = payload();
        let packed = compress_chunk(&raw, Compression::Deflate(6)).unwrap();
        assert!(packed.len() < raw.len());
        let unpacked = decompress_chunk(&packed, COMPRESSOR_DEFLATE, raw.len()).unwrap();
        assert_eq!(unpacked, raw);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_roundtrip() {
        let raw = payload();
        let packed = compress_chunk(&raw, Compression::Zstd(3)).unwrap();
        let unpacked = decompress_chunk(&packed, COMPRESSOR_ZSTD, raw.len()).unwrap();
        assert_eq!(unpacked, raw);
        assert_eq!(resolve(Compression::Zstd(3)), Compression::Zstd(3));
    }

    #[test]
    fn test_capacity_bound() {
        let raw = payload();
        let packed = compress_chunk(&raw, Compression::Deflate(6)).unwrap();
        assert!(matches!(
            decompress_chunk(&packed, COMPRESSOR_DEFLATE, raw.len() - 1),
            Err(SfError::DecompressError(_))
        ));
    }

    #[test]
    fn test_unknown_compressor() {
        assert!(!is_available(9));
        assert!(matches!(
            decompress_chunk(b"x", 9, 1),
            Err(SfError::UnsupportedCompression(9))
        ));
    }

    #[test]
    fn test_garbage_is_decompress_error() {
        let garbage = [0xFFu8; 32];
        assert!(matches!(
            decompress_chunk(&garbage, COMPRESSOR_DEFLATE, 1024),
            Err(SfError::DecompressError(_))
        ));
    }

    #[test]
    fn test_deflate_level_is_clamped() {
        assert_eq!(resolve(Compression::Deflate(22)), Compression::Deflate(9));
    }
}
