//! Property tests for digests and verification.

use proptest::prelude::*;

use packwright::domain::entities::LockEntry;
use packwright::domain::services::verify;
use packwright::domain::value_objects::{DependencyId, Digest, SourceKind};

fn crates_io() -> SourceKind {
    SourceKind::parse("registry+https://github.com/rust-lang/crates.io-index").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: `Digest::parse` never panics, whatever the input.
    #[test]
    fn property_digest_parse_never_panics(input in ".*") {
        let _ = Digest::parse(&input);
    }

    /// PROPERTY: any 64-hex string parses, with or without the prefix, to the same digest.
    #[test]
    fn property_hex_digests_parse_case_insensitively(hex in "[0-9a-fA-F]{64}") {
        let bare = Digest::parse(&hex).unwrap();
        let prefixed = Digest::parse(&format!("sha256:{hex}")).unwrap();
        prop_assert_eq!(&bare, &prefixed);
        prop_assert_eq!(bare.hex(), hex.to_ascii_lowercase());
    }

    /// PROPERTY: verification passes exactly when the bytes hash to the pinned digest.
    #[test]
    fn property_verify_fails_iff_bytes_differ(
        pinned in proptest::collection::vec(any::<u8>(), 0..256),
        fetched in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let entry = LockEntry::new(
            DependencyId::new("dep", "1.0.0"),
            crates_io(),
            Digest::of_bytes(&pinned),
        );

        prop_assert!(verify(&entry, &pinned).is_ok());
        prop_assert_eq!(verify(&entry, &fetched).is_ok(), pinned == fetched);
    }
}
