//! Scenario: Offline rebuild from a warm cache
//!
//! Journey: A first build populates the content store. Later the origin is
//! gone, but every dependency is still served locally and vendored for an
//! offline compile.
//!
//! Success Criteria:
//! - The second run makes no network requests
//! - Every locked crate is unpacked into the vendor directory
//! - A corrupted cache entry is evicted and fetched again

use std::collections::BTreeMap;

use crate::common::*;

/// SCENARIO: warm cache rebuild stages a vendor dir without fetching
#[test]
fn scenario_warm_cache_rebuild_is_offline() {
    let itoa = CrateFixture::new("itoa", "1.0.11");
    let ryu = CrateFixture::new("ryu", "1.0.18");
    let workspace = Workspace::new(&cargo_lock(&[&itoa, &ryu]));
    let cache = tempfile::tempdir().unwrap();
    let (lockfile, out) = (workspace.lockfile(), workspace.out());
    let (overrides, build) = (BTreeMap::new(), release_options());

    let online = MemoryFetcher::new().serving(&itoa).serving(&ryu);
    let toolchain = SpyToolchain::succeeding();
    pipeline(&online, &toolchain, cache.path())
        .build_package(&inputs(&lockfile, workspace.path(), &out, &overrides, &build))
        .unwrap();
    assert_eq!(online.calls().len(), 2);

    let offline = MemoryFetcher::new();
    let vendoring = SpyToolchain::vendoring();
    pipeline(&offline, &vendoring, cache.path())
        .build_package(&inputs(&lockfile, workspace.path(), &out, &overrides, &build))
        .unwrap();

    assert!(offline.calls().is_empty());
    assert_eq!(vendoring.compiles(), 1);
    assert_eq!(
        vendoring.vendored(),
        vec!["itoa-1.0.11".to_string(), "ryu-1.0.18".to_string()]
    );
}

/// SCENARIO: a corrupted cache blob is replaced, not trusted
#[test]
fn scenario_corrupted_cache_entry_is_refetched() {
    let itoa = CrateFixture::new("itoa", "1.0.11");
    let workspace = Workspace::new(&cargo_lock(&[&itoa]));
    let cache = tempfile::tempdir().unwrap();
    let (lockfile, out) = (workspace.lockfile(), workspace.out());
    let (overrides, build) = (BTreeMap::new(), release_options());

    let blob = cache.path().join("blobs").join("sha256").join(itoa.checksum());
    write_file(cache.path(), &format!("blobs/sha256/{}", itoa.checksum()), b"bit rot");

    let fetcher = MemoryFetcher::new().serving(&itoa);
    let toolchain = SpyToolchain::succeeding();
    pipeline(&fetcher, &toolchain, cache.path())
        .build_package(&inputs(&lockfile, workspace.path(), &out, &overrides, &build))
        .unwrap();

    assert_eq!(fetcher.calls(), vec![itoa.origin()]);
    assert_eq!(std::fs::read(blob).unwrap(), itoa.bytes);
}
