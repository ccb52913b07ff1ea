#![no_main]

use libfuzzer_sys::fuzz_target;
use sfdata_codec::tree;
use sfdata_format::Limits;

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_string_len: 1 << 20,
        max_container_entries: 1 << 16,
        max_nesting_depth: 64,
        ..Limits::default()
    };

    if let Ok(value) = tree::decode_with_limits(&mut &data[..], &limits) {
        let encoded = tree::encode_to_vec(&value).expect("re-encode");
        let again = tree::decode_with_limits(&mut encoded.as_slice(), &limits).expect("re-decode");
        // compare bytes, NaN doubles are never equal as values
        assert_eq!(encoded, tree::encode_to_vec(&again).expect("re-encode"));
    }
    let _ = tree::salvage(&mut &data[..], &limits);
});
