#![no_main]

use libfuzzer_sys::fuzz_target;
use packwright::domain::value_objects::Digest;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(digest) = Digest::parse(s) {
            // Anything that parses must re-parse from its display form
            assert_eq!(Digest::parse(&digest.to_string()).ok(), Some(digest));
        }
    }
});
