//! Binary tree codec
//!
//! Compact tagged encoding of a [`Value`] tree with no compression and no
//! framing. Every node starts with a [`TypeTag`] byte:
//!
//! | tag    | payload                                                       |
//! |--------|---------------------------------------------------------------|
//! | `0x00` | none                                                          |
//! | `0x01` | ULEB128 byte length + UTF-8 bytes                             |
//! | `0x02` | zigzag ULEB128                                                |
//! | `0x03` | 8 bytes, IEEE-754 little-endian                               |
//! | `0x04` | 1 byte, 0 or 1                                                |
//! | `0x10` | ULEB128 entry count, then (key length, key bytes, node) each  |
//! | `0x11` | ULEB128 element count, then nodes                             |
//!
//! The encoder writes straight into any [`Write`] sink so it can feed a
//! chunked compressor without buffering the whole document.

use std::io::{Read, Write};

use sfdata_format::varint::{
    read_uleb128, read_zigzag, uleb128_len, write_uleb128, write_zigzag, zigzag_encode,
};
use sfdata_format::{Limits, Result, SfError, TypeTag, Value};

/// Encode `value` into `sink`
pub fn encode<W: Write + ?Sized>(value: &Value, sink: &mut W) -> Result<()> {
    match value {
        Value::None => put(sink, &[TypeTag::None as u8]),
        Value::String(s) => {
            put(sink, &[TypeTag::String as u8])?;
            write_str(sink, s)
        }
        Value::Int(i) => {
            put(sink, &[TypeTag::Int as u8])?;
            write_zigzag(sink, *i)
        }
        Value::Double(d) => {
            put(sink, &[TypeTag::Double as u8])?;
            put(sink, &d.to_le_bytes())
        }
        Value::Boolean(b) => put(sink, &[TypeTag::Boolean as u8, u8::from(*b)]),
        Value::Object(map) => {
            put(sink, &[TypeTag::Object as u8])?;
            write_uleb128(sink, map.len() as u64)?;
            for (key, child) in map {
                write_str(sink, key)?;
                encode(child, sink)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            put(sink, &[TypeTag::Array as u8])?;
            write_uleb128(sink, items.len() as u64)?;
            for item in items {
                encode(item, sink)?;
            }
            Ok(())
        }
    }
}

/// Encode `value` into a fresh buffer
pub fn encode_to_vec(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_len(value) as usize);
    encode(value, &mut out)?;
    Ok(out)
}

/// Number of bytes [`encode`] would produce for `value`
pub fn encoded_len(value: &Value) -> u64 {
    1 + match value {
        Value::None => 0,
        Value::String(s) => str_len(s),
        Value::Int(i) => uleb128_len(zigzag_encode(*i)) as u64,
        Value::Double(_) => 8,
        Value::Boolean(_) => 1,
        Value::Object(map) => {
            uleb128_len(map.len() as u64) as u64
                + map
                    .iter()
                    .map(|(key, child)| str_len(key) + encoded_len(child))
                    .sum::<u64>()
        }
        Value::Array(items) => {
            uleb128_len(items.len() as u64) as u64 + items.iter().map(encoded_len).sum::<u64>()
        }
    }
}

fn str_len(s: &str) -> u64 {
    uleb128_len(s.len() as u64) as u64 + s.len() as u64
}

fn put<W: Write + ?Sized>(sink: &mut W, bytes: &[u8]) -> Result<()> {
    sink.write_all(bytes).map_err(SfError::from_io)
}

fn write_str<W: Write + ?Sized>(sink: &mut W, s: &str) -> Result<()> {
    write_uleb128(sink, s.len() as u64)?;
    put(sink, s.as_bytes())
}

/// Decode one tree from `source` with default [`Limits`]
pub fn decode<R: Read + ?Sized>(source: &mut R) -> Result<Value> {
    decode_with_limits(source, &Limits::default())
}

/// Decode one tree from `source`, rejecting input beyond `limits`
pub fn decode_with_limits<R: Read + ?Sized>(source: &mut R, limits: &Limits) -> Result<Value> {
    Decoder::new(limits)
        .decode_node(source, 0)
        .map_err(|halted| halted.error)
}

/// Outcome of a salvaging decode
#[derive(Debug)]
pub struct Salvage {
    /// Everything decoded before the first error
    pub value: Value,
    /// The error that stopped decoding, if any
    pub error: Option<SfError>,
}

/// Decode as much of a tree as possible.
///
/// Never fails: decoding stops at the first error and the partially built
/// tree is returned alongside it. Containers that were being filled keep the
/// entries read so far. A scalar that failed part way is left out rather
/// than replaced with `None`.
pub fn salvage<R: Read + ?Sized>(source: &mut R, limits: &Limits) -> Salvage {
    match Decoder::new(limits).decode_node(source, 0) {
        Ok(value) => Salvage { value, error: None },
        Err(halted) => Salvage {
            value: halted.partial.unwrap_or(Value::None),
            error: Some(halted.error),
        },
    }
}

/// Decoding stopped at `error`
struct Halted {
    /// The container being filled when decoding stopped
    partial: Option<Value>,
    error: SfError,
}

impl From<SfError> for Halted {
    fn from(error: SfError) -> Self {
        Self {
            partial: None,
            error,
        }
    }
}

struct Decoder<'l> {
    limits: &'l Limits,
}

impl<'l> Decoder<'l> {
    fn new(limits: &'l Limits) -> Self {
        Self { limits }
    }

    fn decode_node<R: Read + ?Sized>(
        &self,
        source: &mut R,
        depth: usize,
    ) -> std::result::Result<Value, Halted> {
        let tag = TypeTag::from_u8(read_byte(source)?)?;
        let value = match tag {
            TypeTag::None => Value::None,
            TypeTag::String => Value::String(self.read_string(source)?),
            TypeTag::Int => Value::Int(read_zigzag(source)?),
            TypeTag::Double => {
                let mut bytes = [0u8; 8];
                source.read_exact(&mut bytes).map_err(SfError::from_io)?;
                Value::Double(f64::from_le_bytes(bytes))
            }
            TypeTag::Boolean => Value::Boolean(read_byte(source)? != 0),
            TypeTag::Object => {
                self.check_depth(depth)?;
                let count = self.read_count(source)?;
                let mut map = sfdata_format::Map::with_capacity(count.min(1024));
                for _ in 0..count {
                    let key = match self.read_string(source) {
                        Ok(key) => key,
                        Err(error) => {
                            return Err(Halted {
                                partial: Some(Value::Object(map)),
                                error,
                            })
                        }
                    };
                    match self.decode_node(source, depth + 1) {
                        Ok(child) => {
                            map.insert(key, child);
                        }
                        Err(halted) => {
                            if let Some(child) = halted.partial {
                                map.insert(key, child);
                            }
                            return Err(Halted {
                                partial: Some(Value::Object(map)),
                                error: halted.error,
                            });
                        }
                    }
                }
                Value::Object(map)
            }
            TypeTag::Array => {
                self.check_depth(depth)?;
                let count = self.read_count(source)?;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    match self.decode_node(source, depth + 1) {
                        Ok(item) => items.push(item),
                        Err(halted) => {
                            items.extend(halted.partial);
                            return Err(Halted {
                                partial: Some(Value::Array(items)),
                                error: halted.error,
                            });
                        }
                    }
                }
                Value::Array(items)
            }
        };
        Ok(value)
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth >= self.limits.max_nesting_depth {
            return Err(SfError::LimitExceeded(format!(
                "nesting depth exceeds {}",
                self.limits.max_nesting_depth
            )));
        }
        Ok(())
    }

    fn read_count<R: Read + ?Sized>(&self, source: &mut R) -> Result<usize> {
        let count = read_uleb128(source)?;
        if count > self.limits.max_container_entries {
            return Err(SfError::LimitExceeded(format!(
                "container entry count {count} exceeds {}",
                self.limits.max_container_entries
            )));
        }
        usize::try_from(count).map_err(|_| SfError::LimitExceeded("entry count".to_string()))
    }

    fn read_string<R: Read + ?Sized>(&self, source: &mut R) -> Result<String> {
        let len = read_uleb128(source)?;
        if len > self.limits.max_string_len as u64 {
            return Err(SfError::LimitExceeded(format!(
                "string length {len} exceeds {}",
                self.limits.max_string_len
            )));
        }
        let mut bytes = Vec::with_capacity((len as usize).min(64 * 1024));
        source
            .take(len)
            .read_to_end(&mut bytes)
            .map_err(SfError::from_io)?;
        if bytes.len() as u64 != len {
            return Err(SfError::TruncatedInput);
        }
        String::from_utf8(bytes).map_err(|_| SfError::InvalidUtf8)
    }
}

fn read_byte<R: Read + ?Sized>(source: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    source.read_exact(&mut byte).map_err(SfError::from_io)?;
    Ok(byte[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut root = Value::None;
        root.set("name", "Song").unwrap();
        root.set("level", -99).unwrap();
        root.set("ratio", 0.75).unwrap();
        root.set("alive", true).unwrap();
        root.set("nothing", Value::None).unwrap();
        root.set("empty_obj", Value::object()).unwrap();
        root.set("empty_arr", Value::array()).unwrap();
        root.entry_mut("nested")
            .unwrap()
            .set("list", vec![Value::Int(1), Value::from("two"), Value::Double(3.5)])
            .unwrap();
        root
    }

    #[test]
    fn test_tree_roundtrip() {
        let value = sample();
        let bytes = encode_to_vec(&value).unwrap();
        assert_eq!(bytes.len() as u64, encoded_len(&value));
        assert_eq!(decode(&mut bytes.as_slice()).unwrap(), value);
    }

    #[test]
    fn test_wire_layout() {
        let bytes = encode_to_vec(&Value::Int(-1)).unwrap();
        assert_eq!(bytes, vec![0x02, 0x01]);

        let bytes = encode_to_vec(&Value::from("hi")).unwrap();
        assert_eq!(bytes, vec![0x01, 0x02, b'h', b'i']);

        let bytes = encode_to_vec(&Value::Double(1.0)).unwrap();
        assert_eq!(bytes[0], 0x03);
        assert_eq!(&bytes[1..], &1.0f64.to_le_bytes());

        let mut obj = Value::None;
        obj.set("a", true).unwrap();
        let bytes = encode_to_vec(&obj).unwrap();
        assert_eq!(bytes, vec![0x10, 0x01, 0x01, b'a', 0x04, 0x01]);

        let bytes = encode_to_vec(&Value::Array(vec![Value::None])).unwrap();
        assert_eq!(bytes, vec![0x11, 0x01, 0x00]);
    }

    #[test]
    fn test_invalid_tag() {
        match decode(&mut [0x05u8].as_slice()) {
            Err(SfError::InvalidTag(0x05)) => {}
            other => panic!("expected InvalidTag, got {other:?}"),
        }
    }

    #[test]
    fn test_truncation_anywhere_is_reported() {
        let bytes = encode_to_vec(&sample()).unwrap();
        for cut in 0..bytes.len() {
            match decode(&mut &bytes[..cut]) {
                Err(SfError::TruncatedInput) => {}
                other => panic!("cut at {cut}: expected TruncatedInput, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_salvage_keeps_prefix() {
        let bytes = encode_to_vec(&sample()).unwrap();
        let cut = bytes.len() / 2;
        let salvage = salvage(&mut &bytes[..cut], &Limits::default());
        assert!(matches!(salvage.error, Some(SfError::TruncatedInput)));
        assert_eq!(salvage.value.get("name").as_str(), Some("Song"));
        assert_eq!(salvage.value.get("level").as_i64(), Some(-99));

        let full = salvage_full(&bytes);
        assert!(full.error.is_none());
        assert_eq!(full.value, sample());
    }

    #[test]
    fn test_salvage_adds_no_elements() {
        let doc = Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)]);
        let mut bytes = encode_to_vec(&doc).unwrap();
        // tag of the third element
        bytes[6] = 0x7F;
        let salvage = salvage_full(&bytes);
        assert!(matches!(salvage.error, Some(SfError::InvalidTag(0x7F))));
        assert_eq!(salvage.value.elements(), &[Value::from(1), Value::from(2)]);

        let mut doc = Value::None;
        doc.set("a", 1).unwrap();
        doc.set("b", "text").unwrap();
        let bytes = encode_to_vec(&doc).unwrap();
        // cut inside the string payload of "b"
        let salvage = salvage_full(&bytes[..bytes.len() - 2]);
        assert!(matches!(salvage.error, Some(SfError::TruncatedInput)));
        assert_eq!(salvage.value.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_salvage_keeps_nested_partial_container() {
        let inner = Value::Array(vec![Value::from("x"), Value::from("y")]);
        let doc = Value::Array(vec![Value::from(true), inner]);
        let bytes = encode_to_vec(&doc).unwrap();
        let salvage = salvage_full(&bytes[..bytes.len() - 1]);
        assert!(salvage.error.is_some());
        assert_eq!(salvage.value.len(), 2);
        assert_eq!(salvage.value.at(1).elements(), &[Value::from("x")]);
    }

    fn salvage_full(bytes: &[u8]) -> Salvage {
        salvage(&mut &bytes[..], &Limits::default())
    }

    #[test]
    fn test_limits_enforced() {
        let limits = Limits {
            max_nesting_depth: 2,
            max_string_len: 3,
            max_container_entries: 2,
            ..Limits::default()
        };

        let deep = Value::Array(vec![Value::Array(vec![Value::Array(vec![])])]);
        let bytes = encode_to_vec(&deep).unwrap();
        assert!(matches!(
            decode_with_limits(&mut bytes.as_slice(), &limits),
            Err(SfError::LimitExceeded(_))
        ));

        let long = encode_to_vec(&Value::from("abcd")).unwrap();
        assert!(matches!(
            decode_with_limits(&mut long.as_slice(), &limits),
            Err(SfError::LimitExceeded(_))
        ));

        let wide = encode_to_vec(&Value::Array(vec![Value::None; 3])).unwrap();
        assert!(matches!(
            decode_with_limits(&mut wide.as_slice(), &limits),
            Err(SfError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_huge_declared_count_does_not_preallocate() {
        // array claiming u32::MAX elements followed by nothing
        let mut bytes = vec![0x11];
        write_uleb128(&mut bytes, u32::MAX as u64).unwrap();
        let limits = Limits {
            max_container_entries: u64::MAX,
            ..Limits::default()
        };
        assert!(matches!(
            decode_with_limits(&mut bytes.as_slice(), &limits),
            Err(SfError::TruncatedInput)
        ));
    }
}
