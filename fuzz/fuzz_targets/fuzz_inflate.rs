#![no_main]

use libfuzzer_sys::fuzz_target;
use zipflate::inflate;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes may fail - that's OK
    // We're looking for panics/crashes, not errors
    let mut dst = vec![0u8; 1 << 16];
    let _ = inflate(data, &mut dst);
});
