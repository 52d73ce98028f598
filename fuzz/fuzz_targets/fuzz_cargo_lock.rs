#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;
use packwright::infrastructure::CargoLockRepository;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Cargo.lock parsing should never panic
        let _ = CargoLockRepository::new().parse(content, &BTreeMap::new());
    }
});
