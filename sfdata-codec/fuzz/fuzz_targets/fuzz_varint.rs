#![no_main]

use libfuzzer_sys::fuzz_target;
use sfdata_format::varint::{decode_uleb128, read_zigzag};

fuzz_target!(|data: &[u8]| {
    let _ = decode_uleb128(data);
    let _ = read_zigzag(&mut &data[..]);
});
