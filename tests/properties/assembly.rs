//! Property tests for image assembly.

use proptest::prelude::*;

use packwright::application::AssembleUseCase;
use packwright::domain::entities::{
    BuildArtifact, BuildLog, BuildMetadata, CreatedTimestamp, ImageSpec,
};
use packwright::domain::value_objects::Digest;

use crate::common::HostImageRoot;

fn artifact(bytes: Vec<u8>) -> BuildArtifact {
    BuildArtifact::new(
        "app",
        bytes,
        BuildMetadata {
            toolchain_version: "rustc 1.80.0".to_string(),
            target_triple: "aarch64-unknown-linux-gnu".to_string(),
            profile: "release".to_string(),
            source_digest: Digest::of_bytes(b"src"),
        },
        BuildLog::new(),
    )
}

fn spec(host: &HostImageRoot, env: &[(String, String)]) -> ImageSpec {
    let mut builder = ImageSpec::builder("app", "app")
        .base_root(host.base())
        .trust_bundle(host.trust_bundle(), "/etc/ssl/certs/ca-bundle.crt")
        .supervisor(host.supervisor(), "/bin/tini")
        .created(CreatedTimestamp::epoch());
    for (key, value) in env {
        builder = builder.env(key.clone(), value.clone());
    }
    builder.build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: assembling the same inputs twice yields the same image id and layers.
    #[test]
    fn property_assembly_is_deterministic(
        binary in proptest::collection::vec(any::<u8>(), 1..512),
        env in proptest::collection::btree_map("APP_[A-Z]{1,8}", "[ -~]{0,16}", 0..4),
    ) {
        let host = HostImageRoot::new();
        let env: Vec<(String, String)> = env.into_iter().collect();
        let spec = spec(&host, &env);
        let artifact = artifact(binary);

        let first = AssembleUseCase::new().execute(&spec, &artifact).unwrap();
        let second = AssembleUseCase::new().execute(&spec, &artifact).unwrap();

        prop_assert_eq!(first.id(), second.id());
        let first_layers: Vec<&Digest> = first.layers().iter().map(|l| l.digest()).collect();
        let second_layers: Vec<&Digest> = second.layers().iter().map(|l| l.digest()).collect();
        prop_assert_eq!(first_layers, second_layers);
        prop_assert_eq!(first.config().architecture.as_str(), "arm64");
    }

    /// PROPERTY: changing the binary changes only the application layer.
    #[test]
    fn property_binary_only_touches_app_layer(
        a in proptest::collection::vec(any::<u8>(), 1..256),
        b in proptest::collection::vec(any::<u8>(), 1..256),
    ) {
        prop_assume!(a != b);
        let host = HostImageRoot::new();
        let spec = spec(&host, &[]);

        let first = AssembleUseCase::new().execute(&spec, &artifact(a)).unwrap();
        let second = AssembleUseCase::new().execute(&spec, &artifact(b)).unwrap();

        prop_assert_eq!(first.layers()[0].digest(), second.layers()[0].digest());
        prop_assert_eq!(first.layers()[1].digest(), second.layers()[1].digest());
        prop_assert_ne!(first.layers()[2].digest(), second.layers()[2].digest());
        prop_assert_ne!(first.id(), second.id());
    }
}
