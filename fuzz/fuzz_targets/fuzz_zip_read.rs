#![no_main]

use libfuzzer_sys::fuzz_target;
use zipflate::Archive;

fuzz_target!(|data: &[u8]| {
    // Parsing may fail on invalid input - that's OK
    // We're looking for panics/crashes, not errors
    if let Ok(archive) = Archive::parse(data) {
        for member in archive.members() {
            // Cap the scratch allocation; oversized members just hit OutputFull
            let n = (member.uncomp_size as usize).min(1 << 20);
            let mut dst = vec![0u8; n];
            let _ = member.extract(&mut dst);
        }
    }
});
