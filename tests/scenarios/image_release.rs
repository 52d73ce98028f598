//! Scenario: Releasing a service image
//!
//! Journey: A service with two crates.io dependencies is built into an
//! image with a pinned creation time, twice.
//!
//! Success Criteria:
//! - The archive lands in the output directory under `<name>-<tag>.tar`
//! - The entrypoint runs the binary under the supervisor
//! - Two runs from identical inputs produce byte-identical archives

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use packwright::domain::entities::{CreatedTimestamp, ImageSpec};
use packwright::domain::value_objects::ExposedPort;

use crate::common::*;

fn spec(host: &HostImageRoot) -> ImageSpec {
    ImageSpec::builder("registry.example.com/ops/app", "app")
        .tag("1.4.2")
        .base_root(host.base())
        .trust_bundle(host.trust_bundle(), "/etc/ssl/certs/ca-bundle.crt")
        .supervisor(host.supervisor(), "/bin/tini")
        .env("RUST_LOG", "info")
        .expose(ExposedPort::tcp(9090))
        .created(CreatedTimestamp::epoch())
        .build()
        .unwrap()
}

fn archive_entries(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = tar::Archive::new(bytes);
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (path, data)
        })
        .collect()
}

/// SCENARIO: image build end-to-end
#[test]
fn scenario_release_image_is_wrapped_and_reproducible() {
    let itoa = CrateFixture::new("itoa", "1.0.11");
    let ryu = CrateFixture::new("ryu", "1.0.18");
    let workspace = Workspace::new(&cargo_lock(&[&itoa, &ryu]));
    let host = HostImageRoot::new();
    let cache = tempfile::tempdir().unwrap();

    let fetcher = MemoryFetcher::new().serving(&itoa).serving(&ryu);
    let toolchain = SpyToolchain::succeeding();
    let pipeline = pipeline(&fetcher, &toolchain, cache.path());
    let spec = spec(&host);

    let (lockfile, overrides, build) = (workspace.lockfile(), BTreeMap::new(), release_options());
    let first_out = workspace.path().join("first");
    let summary = pipeline
        .build_image(
            &inputs(&lockfile, workspace.path(), &first_out, &overrides, &build),
            &spec,
        )
        .unwrap();

    assert_eq!(summary.action, "build-image");
    assert_eq!(summary.dependencies, 2);
    assert_eq!(summary.output, first_out.join("registry.example.com_ops_app-1.4.2.tar"));
    assert!(summary.output.is_file());

    let image = summary.image.as_ref().expect("image summary");
    assert_eq!(image.reference, "registry.example.com/ops/app:1.4.2");
    assert_eq!(image.entrypoint.len(), 3);
    assert_eq!(image.entrypoint[0], "/bin/tini");
    assert_eq!(image.entrypoint[1], "--");
    assert_eq!(image.entrypoint[2], "/bin/app");
    assert_eq!(image.layers.len(), 3);

    let entries = archive_entries(&std::fs::read(&summary.output).unwrap());
    assert!(entries.contains_key("oci-layout"));
    assert!(entries.contains_key("index.json"));
    let docker: serde_json::Value =
        serde_json::from_slice(&entries["manifest.json"]).unwrap();
    assert_eq!(docker[0]["RepoTags"][0], "registry.example.com/ops/app:1.4.2");
    for layer in &image.layers {
        let hex = layer.strip_prefix("sha256:").unwrap();
        assert!(entries.contains_key(&format!("blobs/sha256/{hex}")));
    }

    let config_path = docker[0]["Config"].as_str().unwrap();
    let config: serde_json::Value = serde_json::from_slice(&entries[config_path]).unwrap();
    let env: BTreeSet<&str> = config["config"]["Env"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(env.contains("SSL_CERT_FILE=/etc/ssl/certs/ca-bundle.crt"));
    assert!(env.contains("OBSERVABILITY_ADDRESS=0.0.0.0:9090"));
    assert!(env.contains("RUST_LOG=info"));
    assert!(config["config"]["ExposedPorts"]["9090/tcp"].is_object());

    // Second run: warm cache, same inputs, same bytes
    let second_out = workspace.path().join("second");
    let again = pipeline
        .build_image(
            &inputs(&lockfile, workspace.path(), &second_out, &overrides, &build),
            &spec,
        )
        .unwrap();

    assert_eq!(again.image, summary.image);
    assert_eq!(
        std::fs::read(&summary.output).unwrap(),
        std::fs::read(&again.output).unwrap()
    );
    assert_eq!(fetcher.calls().len(), 2, "second run is served from the cache");
}

/// SCENARIO: package build publishes an executable binary
#[test]
fn scenario_package_build_publishes_executable() {
    let itoa = CrateFixture::new("itoa", "1.0.11");
    let workspace = Workspace::new(&cargo_lock(&[&itoa]));
    let cache = tempfile::tempdir().unwrap();

    let fetcher = MemoryFetcher::new().serving(&itoa);
    let toolchain = SpyToolchain::succeeding();
    let pipeline = pipeline(&fetcher, &toolchain, cache.path());

    let (lockfile, out) = (workspace.lockfile(), workspace.out());
    let (overrides, build) = (BTreeMap::new(), release_options());
    let summary = pipeline
        .build_package(&inputs(&lockfile, workspace.path(), &out, &overrides, &build))
        .unwrap();

    assert_eq!(summary.action, "build-package");
    assert!(summary.image.is_none());
    assert_eq!(summary.output, out.join("bin").join("app"));
    assert_eq!(std::fs::read(&summary.output).unwrap(), b"\x7fELF app");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&summary.output).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
