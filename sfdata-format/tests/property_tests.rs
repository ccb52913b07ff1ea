//! Property-based tests for SfData format primitives

use std::io::Cursor;

use proptest::prelude::*;
use sfdata_format::checksum::{compute_crc32, Crc32};
use sfdata_format::varint::{
    decode_uleb128, encode_uleb128, read_uleb128, read_zigzag, uleb128_len, write_zigzag,
    zigzag_decode, zigzag_encode,
};
use sfdata_format::{ChunkDescriptor, ContainerHeader, DescriptorTable, Value};

proptest! {
    #[test]
    fn uleb128_roundtrip_property(value in any::<u64>()) {
        let encoded = encode_uleb128(value);
        prop_assert_eq!(encoded.len(), uleb128_len(value));
        let (decoded, consumed) = decode_uleb128(&encoded).expect("Failed to decode ULEB128");
        prop_assert_eq!(value, decoded);
        prop_assert_eq!(consumed, encoded.len());

        let streamed = read_uleb128(&mut Cursor::new(encoded.to_vec())).unwrap();
        prop_assert_eq!(value, streamed);
    }

    #[test]
    fn zigzag_roundtrip_property(value in any::<i64>()) {
        prop_assert_eq!(zigzag_decode(zigzag_encode(value)), value);

        let mut buf = Vec::new();
        write_zigzag(&mut buf, value).unwrap();
        prop_assert_eq!(read_zigzag(&mut Cursor::new(buf)).unwrap(), value);
    }

    #[test]
    fn small_magnitudes_stay_short(value in -64i64..64) {
        prop_assert_eq!(encode_uleb128(zigzag_encode(value)).len(), 1);
    }

    #[test]
    fn crc32_split_anywhere_property(
        data in prop::collection::vec(any::<u8>(), 0..2048),
        split in any::<prop::sample::Index>()
    ) {
        let at = if data.is_empty() { 0 } else { split.index(data.len()) };
        let mut crc = Crc32::new();
        crc.update(&data[..at]);
        crc.update(&data[at..]);
        prop_assert_eq!(crc.digest(), compute_crc32(&data));
    }

    #[test]
    fn header_roundtrip_property(
        compression_id in 1u8..=2,
        chunk_size in 1u32..u32::MAX,
        chunk_count in any::<u32>(),
        total_raw_len in any::<u64>(),
        descriptor_offset in any::<u64>(),
        descriptor_len in any::<u64>(),
    ) {
        let header = ContainerHeader {
            compression_id,
            chunk_size,
            chunk_count,
            total_raw_len,
            descriptor_offset,
            descriptor_len,
            ..ContainerHeader::default()
        };
        prop_assert_eq!(ContainerHeader::decode(&header.encode()).unwrap(), header);
    }

    #[test]
    fn descriptor_table_roundtrip_property(
        raw in prop::collection::vec((any::<u32>(), any::<u32>(), any::<u32>()), 0..64)
    ) {
        let table = DescriptorTable {
            entries: raw
                .into_iter()
                .map(|(compressed_len, raw_len, checksum)| ChunkDescriptor {
                    compressed_len,
                    raw_len,
                    checksum,
                })
                .collect(),
        };
        let bytes = table.encode().unwrap();
        prop_assert_eq!(DescriptorTable::decode(&bytes).unwrap(), table);
    }

    #[test]
    fn set_at_length_property(index in 0usize..256) {
        let mut value = Value::None;
        value.set_at(index, 1).unwrap();
        prop_assert_eq!(value.len(), index + 1);
        prop_assert_eq!(value.at(index).as_i64(), Some(1));
        prop_assert!(value.elements()[..index].iter().all(Value::is_none));
    }
}
