#![no_main]

use libfuzzer_sys::fuzz_target;
use sfdata_codec::compress::decompress_chunk;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let compressor_id = data[0] % 3;
    let raw_len = (data[1] as usize) << 8;
    let _ = decompress_chunk(&data[2..], compressor_id, raw_len);
});
