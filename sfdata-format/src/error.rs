//! Error types for SfData

use std::fmt;
use std::io;

use thiserror::Error;

/// SfData error types
#[derive(Debug, Error)]
pub enum SfError {
    /// A key in SfFormat text was not followed by `:`.
    #[error("Expected ':' after key '{key}' at offset {offset}")]
    MalformedPair {
        /// The key that was read before the missing separator.
        key: String,
        /// Byte offset where `:` was expected.
        offset: usize,
    },
    /// Binary tree node started with an unknown tag byte.
    #[error("Invalid tag byte: 0x{0:02x}")]
    InvalidTag(u8),
    /// Input ended in the middle of a varint, node or fixed-size field.
    #[error("Truncated input")]
    TruncatedInput,
    /// Container does not start with the expected magic number.
    #[error("Bad magic: 0x{0:08x}")]
    BadMagic(u32),
    /// Container version is not supported by this decoder.
    #[error("Version mismatch: {0}")]
    VersionMismatch(u8),
    /// Header checksum does not match its contents.
    #[error("Corrupt header")]
    CorruptHeader,
    /// Descriptor table disagrees with the header or is malformed.
    #[error("Corrupt descriptor table: {0}")]
    CorruptDescriptorTable(String),
    /// Recomputed chunk checksum differs from the stored one.
    #[error("Chunk {index} corrupt: expected checksum 0x{expected:08x}, got 0x{actual:08x}")]
    ChunkCorrupt {
        /// Zero-based chunk position.
        index: usize,
        /// Checksum stored in the descriptor table.
        expected: u32,
        /// Checksum of the decompressed bytes.
        actual: u32,
    },
    /// Underlying compression codec reported an error.
    #[error("Decompression error: {0}")]
    DecompressError(String),
    /// Container names a compression algorithm this build cannot handle.
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(u8),
    /// A configured limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// Binary string or key bytes were not valid UTF-8.
    #[error("Invalid UTF-8 in string payload")]
    InvalidUtf8,
    /// A write targeted a value whose variant cannot hold it.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Variant the operation requires.
        expected: &'static str,
        /// Variant the value actually holds.
        found: &'static str,
    },
    /// Object mapper could not convert between a host type and a value.
    #[error("Mapping error: {0}")]
    Mapper(String),
    /// Background operation was cancelled before it started.
    #[error("Operation cancelled")]
    Cancelled,
    /// Background task panicked or was aborted.
    #[error("Background task failed: {0}")]
    TaskFailed(String),
    /// I/O operation failed while reading or writing data.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SfError {
    /// Recover an error that travelled through an `io::Read`/`io::Write` adapter.
    ///
    /// Errors tunnelled with [`SfError::into_io`] come back unchanged,
    /// `UnexpectedEof` becomes [`SfError::TruncatedInput`], and everything
    /// else is kept as [`SfError::Io`].
    pub fn from_io(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<SfError>()) {
            if let Some(inner) = err.into_inner() {
                return match inner.downcast::<SfError>() {
                    Ok(sf) => *sf,
                    Err(other) => SfError::Io(io::Error::other(other)),
                };
            }
            return SfError::Internal("tunnelled error vanished".to_string());
        }
        if err.kind() == io::ErrorKind::UnexpectedEof {
            return SfError::TruncatedInput;
        }
        SfError::Io(err)
    }

    /// Wrap this error so it can pass through an `io::Read`/`io::Write` boundary.
    pub fn into_io(self) -> io::Error {
        match self {
            SfError::Io(err) => err,
            other => io::Error::other(other),
        }
    }
}

impl serde::ser::Error for SfError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SfError::Mapper(msg.to_string())
    }
}

impl serde::de::Error for SfError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SfError::Mapper(msg.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SfError>;
