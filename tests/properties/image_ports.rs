//! Property tests for the observability address / exposed port contract.

use proptest::prelude::*;

use packwright::domain::entities::ImageSpec;
use packwright::domain::value_objects::ExposedPort;

fn builder(address: &str) -> packwright::domain::entities::ImageSpecBuilder {
    ImageSpec::builder("app", "app")
        .trust_bundle("/host/ca.crt", "/etc/ssl/certs/ca-bundle.crt")
        .supervisor("/host/tini", "/bin/tini")
        .observability_address(address)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: a spec builds iff the declared port equals the observability port.
    #[test]
    fn property_declared_port_must_match_address(listen in 1u16.., declared in 1u16..) {
        let address = format!("0.0.0.0:{listen}");
        let result = builder(&address).expose(ExposedPort::tcp(declared)).build();

        prop_assert_eq!(result.is_ok(), listen == declared);
    }

    /// PROPERTY: with no declaration, the exposed port is derived from the address.
    #[test]
    fn property_env_and_ports_always_agree(
        octets in proptest::array::uniform4(any::<u8>()),
        port in 1u16..,
    ) {
        let address = format!("{}.{}.{}.{}:{port}", octets[0], octets[1], octets[2], octets[3]);
        let spec = builder(&address).build().unwrap();

        prop_assert_eq!(&spec.env()["OBSERVABILITY_ADDRESS"], &address);
        prop_assert_eq!(spec.observability_address().port(), port);
        prop_assert_eq!(spec.exposed_ports().len(), 1);
        prop_assert!(spec.exposed_ports().contains(&ExposedPort::tcp(port)));
    }

    /// PROPERTY: the entrypoint always wraps the binary in the supervisor.
    #[test]
    fn property_entrypoint_wraps_binary(name in "[a-z][a-z0-9_-]{0,20}") {
        let spec = ImageSpec::builder("app", name.clone())
            .trust_bundle("/host/ca.crt", "/etc/ssl/certs/ca-bundle.crt")
            .supervisor("/host/tini", "/bin/tini")
            .build()
            .unwrap();

        let expected = vec!["/bin/tini".to_string(), "--".to_string(), format!("/bin/{name}")];
        prop_assert_eq!(spec.entrypoint(), expected.as_slice());
    }
}
