#![no_main]

use libfuzzer_sys::fuzz_target;
use packwright::domain::value_objects::{DependencyId, SourceKind};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Source strings and origin inference should never panic
        if let Some(kind) = SourceKind::parse(s) {
            let _ = kind.replacement_key();
            let _ = kind.default_origin(&DependencyId::new("fuzz", "0.0.0"));
        }
    }
});
