//! Security-focused property tests for SfData decoders
//!
//! Arbitrary and adversarial input must never panic, hang or allocate
//! according to attacker-declared sizes.

use proptest::prelude::*;
use sfdata_codec::compress::decompress_chunk;
use sfdata_codec::{text, tree, Limits, SfError};
use sfdata_format::constants::{COMPRESSOR_DEFLATE, TAG_ARRAY, TAG_OBJECT, TAG_STRING};
use sfdata_format::varint::encode_uleb128;

fn tight_limits() -> Limits {
    Limits {
        max_nesting_depth: 32,
        max_string_len: 4096,
        max_container_entries: 1024,
        ..Limits::default()
    }
}

proptest! {
    #[test]
    fn random_bytes_never_panic_tree_decoder(input in prop::collection::vec(any::<u8>(), 0..4096)) {
        let _ = tree::decode_with_limits(&mut input.as_slice(), &tight_limits());
        let _ = tree::salvage(&mut input.as_slice(), &tight_limits());
    }

    #[test]
    fn random_text_never_panics_parser(input in "\\PC{0,512}") {
        if let Ok(value) = text::parse_with_limits(&input, &tight_limits()) {
            let _ = text::dump(&value, true);
        }
    }

    #[test]
    fn random_bracket_soup_terminates(input in "[\\[\\]{}:,\" a1#\n]{0,256}") {
        let _ = text::parse_with_limits(&input, &tight_limits());
    }

    #[test]
    fn random_deflate_input_is_bounded(
        input in prop::collection::vec(any::<u8>(), 0..2048),
        raw_len in 0usize..4096
    ) {
        if let Ok(out) = decompress_chunk(&input, COMPRESSOR_DEFLATE, raw_len) {
            prop_assert!(out.len() <= raw_len);
        }
    }
}

#[test]
fn declared_string_length_beyond_limit_is_rejected_before_reading() {
    let mut bytes = vec![TAG_STRING];
    bytes.extend_from_slice(&encode_uleb128(1 << 40));
    match tree::decode_with_limits(&mut bytes.as_slice(), &tight_limits()) {
        Err(SfError::LimitExceeded(msg)) => assert!(msg.contains("string length")),
        other => panic!("expected LimitExceeded, got {other:?}"),
    }
}

#[test]
fn declared_entry_count_beyond_limit_is_rejected() {
    for tag in [TAG_OBJECT, TAG_ARRAY] {
        let mut bytes = vec![tag];
        bytes.extend_from_slice(&encode_uleb128(u64::MAX >> 1));
        assert!(matches!(
            tree::decode_with_limits(&mut bytes.as_slice(), &tight_limits()),
            Err(SfError::LimitExceeded(_))
        ));
    }
}

#[test]
fn deep_nesting_is_rejected_without_stack_overflow() {
    let bytes: Vec<u8> = std::iter::repeat([TAG_ARRAY, 0x01])
        .take(100_000)
        .flatten()
        .collect();
    assert!(matches!(
        tree::decode_with_limits(&mut bytes.as_slice(), &tight_limits()),
        Err(SfError::LimitExceeded(_))
    ));

    let text_input = "[".repeat(100_000);
    assert!(matches!(
        text::parse_with_limits(&text_input, &tight_limits()),
        Err(SfError::LimitExceeded(_))
    ));
}

#[test]
fn overlong_varint_is_rejected() {
    let mut bytes = vec![TAG_ARRAY];
    bytes.extend_from_slice(&[0xFF; 11]);
    assert!(matches!(
        tree::decode_with_limits(&mut bytes.as_slice(), &tight_limits()),
        Err(SfError::LimitExceeded(_))
    ));
}

#[test]
fn invalid_utf8_in_string_is_rejected() {
    let bytes = vec![TAG_STRING, 0x02, 0xC3, 0x28];
    assert!(matches!(
        tree::decode(&mut bytes.as_slice()),
        Err(SfError::InvalidUtf8)
    ));
}
