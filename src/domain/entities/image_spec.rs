//! Image specification - the validated description of a container image
//!
//! Every environment variable, port and path baked into the image lives in one
//! `ImageSpec`. The builder checks the cross-field invariants up front so that
//! assembly never sees an inconsistent declaration:
//!
//! - `OBSERVABILITY_ADDRESS` parses as a socket address and its port is the
//!   one (and only) exposed TCP port
//! - `SSL_CERT_FILE` points at the embedded trust bundle
//! - environment keys are unique
//! - the entrypoint starts with the supervisor

use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::services::entrypoint::Entrypoint;
use crate::domain::value_objects::{ExposedPort, Protocol};
use crate::error::{PipelineError, PipelineResult};

/// Environment variable binding the observability listener
pub const OBSERVABILITY_ADDRESS_VAR: &str = "OBSERVABILITY_ADDRESS";
/// Environment variable pointing TLS clients at the trust bundle
pub const SSL_CERT_FILE_VAR: &str = "SSL_CERT_FILE";

pub const DEFAULT_OBSERVABILITY_ADDRESS: &str = "0.0.0.0:9090";
pub const DEFAULT_TRUST_BUNDLE_PATH: &str = "/etc/ssl/certs/ca-bundle.crt";
pub const DEFAULT_SUPERVISOR_PATH: &str = "/bin/tini";
pub const DEFAULT_PATHS_TO_LINK: &[&str] = &["/bin"];

/// How the image's `created` field is filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreatedTimestamp {
    /// Wall-clock time of the build (not bit-for-bit reproducible)
    #[default]
    Now,
    /// A fixed instant
    Pinned(DateTime<Utc>),
}

impl CreatedTimestamp {
    /// Unix epoch, for fully reproducible config blobs
    pub fn epoch() -> Self {
        CreatedTimestamp::Pinned(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn resolve(&self) -> DateTime<Utc> {
        match self {
            CreatedTimestamp::Now => Utc::now(),
            CreatedTimestamp::Pinned(at) => *at,
        }
    }
}

/// Validated image specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    name: String,
    tag: String,
    base_roots: Vec<PathBuf>,
    paths_to_link: Vec<String>,
    trust_bundle: PathBuf,
    trust_bundle_path: String,
    supervisor: PathBuf,
    artifact_path: String,
    env: BTreeMap<String, String>,
    observability: SocketAddr,
    exposed_ports: BTreeSet<ExposedPort>,
    entrypoint: Entrypoint,
    created: CreatedTimestamp,
}

impl ImageSpec {
    /// Start building a spec for image `name` running binary `artifact_name`
    pub fn builder(name: impl Into<String>, artifact_name: impl Into<String>) -> ImageSpecBuilder {
        ImageSpecBuilder::new(name.into(), artifact_name.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `name:tag` reference
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    /// Host package roots whose linked paths form the base layer
    pub fn base_roots(&self) -> &[PathBuf] {
        &self.base_roots
    }

    /// Path prefixes (e.g. `/bin`) copied from each base root
    pub fn paths_to_link(&self) -> &[String] {
        &self.paths_to_link
    }

    /// Host path of the certificate bundle
    pub fn trust_bundle(&self) -> &Path {
        &self.trust_bundle
    }

    /// In-image path of the certificate bundle
    pub fn trust_bundle_path(&self) -> &str {
        &self.trust_bundle_path
    }

    /// Host path of the supervisor binary
    pub fn supervisor(&self) -> &Path {
        &self.supervisor
    }

    pub fn supervisor_path(&self) -> &str {
        self.entrypoint.supervisor()
    }

    pub fn artifact_path(&self) -> &str {
        &self.artifact_path
    }

    /// Complete runtime environment, including managed variables
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn exposed_ports(&self) -> &BTreeSet<ExposedPort> {
        &self.exposed_ports
    }

    pub fn entrypoint(&self) -> &[String] {
        self.entrypoint.as_slice()
    }

    pub fn created(&self) -> CreatedTimestamp {
        self.created
    }

    /// Socket address the observability listener binds to
    pub fn observability_address(&self) -> SocketAddr {
        self.observability
    }
}

/// Builder for [`ImageSpec`]
#[derive(Debug, Clone)]
pub struct ImageSpecBuilder {
    name: String,
    artifact_name: String,
    tag: String,
    base_roots: Vec<PathBuf>,
    paths_to_link: Vec<String>,
    trust_bundle: Option<PathBuf>,
    trust_bundle_path: String,
    supervisor: Option<PathBuf>,
    supervisor_path: String,
    observability_address: String,
    env: Vec<(String, String)>,
    exposed_ports: Vec<ExposedPort>,
    created: CreatedTimestamp,
}

impl ImageSpecBuilder {
    fn new(name: String, artifact_name: String) -> Self {
        Self {
            name,
            artifact_name,
            tag: "latest".to_string(),
            base_roots: Vec::new(),
            paths_to_link: DEFAULT_PATHS_TO_LINK.iter().map(|s| s.to_string()).collect(),
            trust_bundle: None,
            trust_bundle_path: DEFAULT_TRUST_BUNDLE_PATH.to_string(),
            supervisor: None,
            supervisor_path: DEFAULT_SUPERVISOR_PATH.to_string(),
            observability_address: DEFAULT_OBSERVABILITY_ADDRESS.to_string(),
            env: Vec::new(),
            exposed_ports: Vec::new(),
            created: CreatedTimestamp::Now,
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn base_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.base_roots.push(root.into());
        self
    }

    pub fn paths_to_link(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.paths_to_link = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Host certificate bundle and the in-image path it is placed at
    pub fn trust_bundle(mut self, host: impl Into<PathBuf>, in_image: impl Into<String>) -> Self {
        self.trust_bundle = Some(host.into());
        self.trust_bundle_path = in_image.into();
        self
    }

    /// Host supervisor binary and the in-image path it is placed at
    pub fn supervisor(mut self, host: impl Into<PathBuf>, in_image: impl Into<String>) -> Self {
        self.supervisor = Some(host.into());
        self.supervisor_path = in_image.into();
        self
    }

    pub fn observability_address(mut self, address: impl Into<String>) -> Self {
        self.observability_address = address.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Declare an exposed port; must agree with the observability address
    pub fn expose(mut self, port: ExposedPort) -> Self {
        self.exposed_ports.push(port);
        self
    }

    pub fn created(mut self, created: CreatedTimestamp) -> Self {
        self.created = created;
        self
    }

    /// Validate and build the spec
    pub fn build(self) -> PipelineResult<ImageSpec> {
        validate_reference_part("image name", &self.name, true)?;
        validate_reference_part("image tag", &self.tag, false)?;
        if self.artifact_name.is_empty() || self.artifact_name.contains('/') {
            return Err(PipelineError::assembly(format!(
                "invalid binary name '{}'",
                self.artifact_name
            )));
        }
        for path in self
            .paths_to_link
            .iter()
            .chain([&self.trust_bundle_path, &self.supervisor_path])
        {
            if !path.starts_with('/') {
                return Err(PipelineError::assembly(format!(
                    "in-image path '{path}' must be absolute"
                )));
            }
        }

        let trust_bundle = self
            .trust_bundle
            .ok_or_else(|| PipelineError::assembly("no trust bundle declared"))?;
        let supervisor = self
            .supervisor
            .ok_or_else(|| PipelineError::assembly("no supervisor declared"))?;

        let observability: SocketAddr = self.observability_address.parse().map_err(|_| {
            PipelineError::assembly(format!(
                "{OBSERVABILITY_ADDRESS_VAR} '{}' is not a host:port socket address",
                self.observability_address
            ))
        })?;
        let observability_port = ExposedPort::tcp(observability.port());

        let mut env = BTreeMap::new();
        env.insert(
            SSL_CERT_FILE_VAR.to_string(),
            self.trust_bundle_path.clone(),
        );
        env.insert(
            OBSERVABILITY_ADDRESS_VAR.to_string(),
            self.observability_address.clone(),
        );
        let mut seen = BTreeSet::new();
        for (key, value) in self.env {
            if key.is_empty() || key.contains('=') {
                return Err(PipelineError::assembly(format!(
                    "invalid environment variable name '{key}'"
                )));
            }
            if !seen.insert(key.clone()) {
                return Err(PipelineError::assembly(format!(
                    "environment variable '{key}' declared more than once"
                )));
            }
            match env.get(&key) {
                Some(managed) if *managed != value => {
                    return Err(PipelineError::assembly(format!(
                        "environment variable '{key}={value}' conflicts with managed value '{managed}'"
                    )));
                }
                _ => {
                    env.insert(key, value);
                }
            }
        }

        let mut exposed_ports: BTreeSet<ExposedPort> = self.exposed_ports.into_iter().collect();
        if exposed_ports.is_empty() {
            exposed_ports.insert(observability_port);
        }
        let expected = BTreeSet::from([observability_port]);
        if exposed_ports != expected {
            let declared: Vec<String> = exposed_ports.iter().map(|p| p.to_string()).collect();
            return Err(PipelineError::assembly(format!(
                "exposed ports [{}] do not match {OBSERVABILITY_ADDRESS_VAR} port {}/{}",
                declared.join(", "),
                observability.port(),
                Protocol::Tcp
            )));
        }

        let artifact_path = format!("/bin/{}", self.artifact_name);
        let entrypoint = Entrypoint::wrap(&self.supervisor_path, &artifact_path)?;

        Ok(ImageSpec {
            name: self.name,
            tag: self.tag,
            base_roots: self.base_roots,
            paths_to_link: self.paths_to_link,
            trust_bundle,
            trust_bundle_path: self.trust_bundle_path,
            supervisor,
            artifact_path,
            env,
            observability,
            exposed_ports,
            entrypoint,
            created: self.created,
        })
    }
}

fn validate_reference_part(what: &str, value: &str, allow_slash: bool) -> PipelineResult<()> {
    let valid = !value.is_empty()
        && value.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') || (allow_slash && c == '/')
        });
    if valid {
        Ok(())
    } else {
        Err(PipelineError::assembly(format!("invalid {what} '{value}'")))
    }
}
