//! Property tests for lock file parsing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use packwright::infrastructure::CargoLockRepository;
use packwright::PipelineError;

use crate::common::CRATES_IO_SOURCE;

fn package_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_-]{0,15}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: parsing arbitrary text never panics; failures are malformed-entry errors.
    #[test]
    fn property_lockfile_parse_never_panics(content in ".*") {
        match CargoLockRepository::new().parse(&content, &BTreeMap::new()) {
            Ok(_) => {}
            Err(PipelineError::MalformedLockEntry { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error kind: {other:?}"),
        }
    }

    /// PROPERTY: a registry package without a checksum is always rejected.
    #[test]
    fn property_unpinned_registry_package_is_rejected(name in package_name()) {
        let content = format!(
            "version = 4\n\n[[package]]\nname = \"{name}\"\nversion = \"1.0.0\"\nsource = \"{CRATES_IO_SOURCE}\"\n"
        );
        let err = CargoLockRepository::new()
            .parse(&content, &BTreeMap::new())
            .unwrap_err();
        let is_malformed_entry = matches!(err, PipelineError::MalformedLockEntry { .. });
        prop_assert!(is_malformed_entry);
        prop_assert_eq!(err.exit_code(), 3);
    }

    /// PROPERTY: entries come back sorted by identifier, whatever the file order.
    #[test]
    fn property_entries_are_sorted(names in proptest::collection::btree_set(package_name(), 1..8)) {
        let mut content = String::from("version = 4\n");
        for (i, name) in names.iter().rev().enumerate() {
            content.push_str(&format!(
                "\n[[package]]\nname = \"{name}\"\nversion = \"0.{i}.0\"\nsource = \"{CRATES_IO_SOURCE}\"\nchecksum = \"{:064x}\"\n",
                i + 1
            ));
        }

        let lockfile = CargoLockRepository::new().parse(&content, &BTreeMap::new()).unwrap();
        let parsed: Vec<&str> = lockfile.entries().map(|e| e.id().name()).collect();
        let expected: Vec<&str> = names.iter().map(String::as_str).collect();
        prop_assert_eq!(parsed, expected);
    }
}
