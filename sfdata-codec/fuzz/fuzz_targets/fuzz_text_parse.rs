#![no_main]

use libfuzzer_sys::fuzz_target;
use sfdata_codec::text;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    // Whatever parses must survive a dump/parse cycle without panicking
    if let Ok(value) = text::parse(input) {
        let dumped = text::dump(&value, true);
        let _ = text::parse(&dumped);
    }
});
