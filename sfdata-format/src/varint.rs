//! Variable-length integer encoding (ULEB128 / ZigZag)

use std::io::{Read, Write};

use smallvec::SmallVec;

use crate::error::{Result, SfError};

/// Longest ULEB128 encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode a u64 as ULEB128
pub fn encode_uleb128(val: u64) -> SmallVec<[u8; MAX_VARINT_LEN]> {
    let mut result = SmallVec::new();
    let mut x = val;

    while x >= 0x80 {
        result.push((x & 0x7F) as u8 | 0x80);
        x >>= 7;
    }
    result.push((x & 0x7F) as u8);

    result
}

/// Decode ULEB128 from bytes, returning the value and the bytes consumed
pub fn decode_uleb128(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(SfError::LimitExceeded("ULEB128 too long".to_string()));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, i + 1));
        }

        shift += 7;
    }

    Err(SfError::TruncatedInput)
}

/// ZigZag encode a signed integer
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// ZigZag decode to signed integer
pub fn zigzag_decode(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Write an unsigned varint to a sink
pub fn write_uleb128<W: Write + ?Sized>(sink: &mut W, val: u64) -> Result<()> {
    sink.write_all(&encode_uleb128(val))
        .map_err(SfError::from_io)
}

/// Read an unsigned varint from a source.
///
/// Fails with [`SfError::TruncatedInput`] if the source ends mid-sequence.
pub fn read_uleb128<R: Read + ?Sized>(source: &mut R) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;
    let mut byte = [0u8; 1];

    for _ in 0..MAX_VARINT_LEN {
        source.read_exact(&mut byte).map_err(SfError::from_io)?;
        result |= ((byte[0] & 0x7F) as u64) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }

    Err(SfError::LimitExceeded("ULEB128 too long".to_string()))
}

/// Write a zigzag-encoded signed varint to a sink
pub fn write_zigzag<W: Write + ?Sized>(sink: &mut W, val: i64) -> Result<()> {
    write_uleb128(sink, zigzag_encode(val))
}

/// Read a zigzag-encoded signed varint from a source
pub fn read_zigzag<R: Read + ?Sized>(source: &mut R) -> Result<i64> {
    read_uleb128(source).map(zigzag_decode)
}

/// Number of bytes `val` occupies as ULEB128
pub fn uleb128_len(val: u64) -> usize {
    let bits = 64 - (val | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}
