#![no_main]

use libfuzzer_sys::fuzz_target;
use zipflate::{deflate, inflate};

fuzz_target!(|data: &[u8]| {
    // Limit data size to avoid slowdowns
    let data = if data.len() > 64 * 1024 { &data[..64 * 1024] } else { data };

    let mut compressed = vec![0u8; data.len() * 2 + 100];
    let n = deflate(data, &mut compressed).expect("destination is large enough");

    let mut decompressed = vec![0u8; data.len()];
    let result = inflate(&compressed[..n], &mut decompressed).expect("own output must decode");
    assert_eq!(result.src_used, n);
    assert_eq!(result.dst_used, data.len());
    assert_eq!(&decompressed[..], data, "round-trip mismatch");
});
