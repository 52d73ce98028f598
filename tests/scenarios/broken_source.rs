//! Scenario: The source tree does not compile
//!
//! Journey: Every dependency verifies, but the compiler rejects the code.
//!
//! Success Criteria:
//! - The run fails at the build stage with the compiler's log attached
//! - No binary and no image archive are published

use std::collections::BTreeMap;

use packwright::domain::entities::CreatedTimestamp;
use packwright::domain::entities::ImageSpec;
use packwright::{PipelineError, Stage};

use crate::common::*;

/// SCENARIO: compile failure carries the log and publishes nothing
#[test]
fn scenario_compile_failure_reports_log_and_writes_nothing() {
    let itoa = CrateFixture::new("itoa", "1.0.11");
    let workspace = Workspace::new(&cargo_lock(&[&itoa]));
    let cache = tempfile::tempdir().unwrap();
    let host = HostImageRoot::new();

    let fetcher = MemoryFetcher::new().serving(&itoa);
    let toolchain = SpyToolchain::failing();
    let pipeline = pipeline(&fetcher, &toolchain, cache.path());

    let spec = ImageSpec::builder("app", "app")
        .base_root(host.base())
        .trust_bundle(host.trust_bundle(), "/etc/ssl/certs/ca-bundle.crt")
        .supervisor(host.supervisor(), "/bin/tini")
        .created(CreatedTimestamp::epoch())
        .build()
        .unwrap();

    let (lockfile, out) = (workspace.lockfile(), workspace.out());
    let (overrides, build) = (BTreeMap::new(), release_options());
    let err = pipeline
        .build_image(
            &inputs(&lockfile, workspace.path(), &out, &overrides, &build),
            &spec,
        )
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Build);
    assert_eq!(err.exit_code(), 6);
    let log = err.build_log().expect("compile errors carry the build log");
    assert!(!log.is_empty());
    assert!(log.contains("cannot find value `missing`"));
    assert!(matches!(err, PipelineError::Compile { .. }));

    assert_eq!(toolchain.compiles(), 1);
    assert!(!out.exists(), "no archive or binary may be written");
}
