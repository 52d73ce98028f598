//! Scenario: A dependency is tampered with upstream
//!
//! Journey: The lock file pins `serde-1.0.0`, but the origin serves different
//! bytes. The build must stop before the compiler ever runs.
//!
//! Success Criteria:
//! - The run fails with a hash mismatch naming the dependency
//! - The toolchain is never invoked
//! - Nothing is cached under the tampered bytes' digest or the pinned one
//! - No output is published

use std::collections::BTreeMap;

use packwright::domain::value_objects::Digest;
use packwright::{PipelineError, Stage};

use crate::common::*;

/// SCENARIO: tampered crate blocks the whole build
#[test]
fn scenario_tampered_crate_never_reaches_the_compiler() {
    let serde = CrateFixture::new("serde", "1.0.0");
    let tampered = CrateFixture::new("serde", "1.0.0-evil").bytes;
    let workspace = Workspace::new(&cargo_lock(&[&serde]));
    let cache = tempfile::tempdir().unwrap();

    let fetcher = MemoryFetcher::new().with(&serde.origin(), tampered.clone());
    let toolchain = SpyToolchain::succeeding();
    let pipeline = pipeline(&fetcher, &toolchain, cache.path());

    let (lockfile, out) = (workspace.lockfile(), workspace.out());
    let (overrides, build) = (BTreeMap::new(), release_options());
    let err = pipeline
        .build_package(&inputs(&lockfile, workspace.path(), &out, &overrides, &build))
        .unwrap_err();

    match &err {
        PipelineError::HashMismatch { id, expected, actual } => {
            assert_eq!(id, "serde-1.0.0");
            assert_eq!(expected, &serde.digest().to_string());
            assert_eq!(actual, &Digest::of_bytes(&tampered).to_string());
        }
        other => panic!("expected hash mismatch, got {other:?}"),
    }
    assert_eq!(err.stage(), Stage::Resolve);
    assert_eq!(err.exit_code(), 4);

    // Mismatches are not retried
    assert_eq!(fetcher.calls().len(), 1);
    assert_eq!(toolchain.compiles(), 0);

    let blobs = cache.path().join("blobs").join("sha256");
    assert!(!blobs.join(serde.checksum()).exists());
    assert!(!blobs.join(Digest::of_bytes(&tampered).hex()).exists());
    assert!(!out.exists());
}

/// SCENARIO: one bad entry among good ones still fails everything
#[test]
fn scenario_one_tampered_entry_fails_the_set() {
    let good = CrateFixture::new("itoa", "1.0.11");
    let bad = CrateFixture::new("ryu", "1.0.18");
    let workspace = Workspace::new(&cargo_lock(&[&good, &bad]));
    let cache = tempfile::tempdir().unwrap();

    let fetcher = MemoryFetcher::new()
        .serving(&good)
        .with(&bad.origin(), b"not a crate".to_vec());
    let toolchain = SpyToolchain::succeeding();
    let pipeline = pipeline(&fetcher, &toolchain, cache.path());

    let (lockfile, out) = (workspace.lockfile(), workspace.out());
    let (overrides, build) = (BTreeMap::new(), release_options());
    let err = pipeline
        .build_package(&inputs(&lockfile, workspace.path(), &out, &overrides, &build))
        .unwrap_err();

    assert!(matches!(err, PipelineError::HashMismatch { ref id, .. } if id == "ryu-1.0.18"));
    assert_eq!(toolchain.compiles(), 0);
    assert!(!out.exists());
}

/// SCENARIO: an unreachable origin is retried, then reported as a fetch error
#[test]
fn scenario_unreachable_origin_exhausts_retries() {
    let serde = CrateFixture::new("serde", "1.0.0");
    let workspace = Workspace::new(&cargo_lock(&[&serde]));
    let cache = tempfile::tempdir().unwrap();

    let fetcher = MemoryFetcher::new();
    let toolchain = SpyToolchain::succeeding();
    let pipeline = pipeline(&fetcher, &toolchain, cache.path());

    let (lockfile, out) = (workspace.lockfile(), workspace.out());
    let (overrides, build) = (BTreeMap::new(), release_options());
    let err = pipeline
        .build_package(&inputs(&lockfile, workspace.path(), &out, &overrides, &build))
        .unwrap_err();

    match &err {
        PipelineError::Fetch { id, attempts, .. } => {
            assert_eq!(id, "serde-1.0.0");
            assert_eq!(*attempts, 2);
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 5);
    assert_eq!(fetcher.calls(), vec![serde.origin(), serde.origin()]);
    assert_eq!(toolchain.compiles(), 0);
}
