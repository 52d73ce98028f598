//! Configuration type definitions

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::{BuildOptions, ResolveOptions};
use crate::domain::entities::image_spec::{
    DEFAULT_OBSERVABILITY_ADDRESS, DEFAULT_PATHS_TO_LINK, DEFAULT_SUPERVISOR_PATH,
    DEFAULT_TRUST_BUNDLE_PATH,
};
use crate::domain::entities::{CreatedTimestamp, ImageSpec, LockOverride};
use crate::domain::ports::ProfileSettings;
use crate::domain::value_objects::ExposedPort;
use crate::error::{PipelineError, PipelineResult};

use super::loader::{self, ConfigWarning};

/// Host locations probed for a certificate bundle when none is configured
pub const TRUST_BUNDLE_CANDIDATES: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/cert.pem",
];

/// `[package]` - what to compile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Binary target name; also the in-image file name under `/bin`
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_source")]
    pub source: PathBuf,

    #[serde(default = "default_lockfile")]
    pub lockfile: PathBuf,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: None,
            source: default_source(),
            lockfile: default_lockfile(),
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from(".")
}

fn default_lockfile() -> PathBuf {
    PathBuf::from("Cargo.lock")
}

/// `[lock]` - pins that complement the lock file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LockConfig {
    /// `name-version` → hash and/or origin
    #[serde(default)]
    pub overrides: BTreeMap<String, LockOverride>,
}

/// `[fetch]` - network behaviour of the resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_jobs")]
    pub jobs: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
            jobs: default_jobs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    250
}

fn default_jobs() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

/// One `[build.profiles.<name>]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_true")]
    pub release: bool,

    #[serde(default)]
    pub run_tests: bool,

    #[serde(default)]
    pub features: Vec<String>,
}

/// `[build]` - toolchain invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Profile used when the CLI does not pick one
    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default = "default_true")]
    pub deny_unused_dependencies: bool,

    #[serde(default = "default_true")]
    pub isolate_network: bool,

    /// Added to (and overriding) the built-in `release` and `test` profiles
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            deny_unused_dependencies: true,
            isolate_network: true,
            profiles: BTreeMap::new(),
        }
    }
}

fn default_profile() -> String {
    "release".to_string()
}

/// `[image]` - container image declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Image name; defaults to the package name
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_tag")]
    pub tag: String,

    /// Base package roots, earliest wins on conflicting paths
    #[serde(default)]
    pub base_paths: Vec<PathBuf>,

    #[serde(default = "default_paths_to_link")]
    pub paths_to_link: Vec<String>,

    /// Host certificate bundle; probed from well-known locations when unset
    #[serde(default)]
    pub trust_bundle: Option<PathBuf>,

    #[serde(default = "default_trust_bundle_path")]
    pub trust_bundle_path: String,

    /// Host supervisor binary; `tini` from `PATH` when unset
    #[serde(default)]
    pub supervisor: Option<PathBuf>,

    #[serde(default = "default_supervisor_path")]
    pub supervisor_path: String,

    #[serde(default = "default_observability_address")]
    pub observability_address: String,

    /// `now`, `epoch`, or an RFC 3339 timestamp
    #[serde(default = "default_created")]
    pub created: String,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Defaults to the observability port when empty
    #[serde(default)]
    pub exposed_ports: Vec<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            name: None,
            tag: default_tag(),
            base_paths: Vec::new(),
            paths_to_link: default_paths_to_link(),
            trust_bundle: None,
            trust_bundle_path: default_trust_bundle_path(),
            supervisor: None,
            supervisor_path: default_supervisor_path(),
            observability_address: default_observability_address(),
            created: default_created(),
            env: BTreeMap::new(),
            exposed_ports: Vec::new(),
        }
    }
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_paths_to_link() -> Vec<String> {
    DEFAULT_PATHS_TO_LINK.iter().map(|s| s.to_string()).collect()
}

fn default_trust_bundle_path() -> String {
    DEFAULT_TRUST_BUNDLE_PATH.to_string()
}

fn default_supervisor_path() -> String {
    DEFAULT_SUPERVISOR_PATH.to_string()
}

fn default_observability_address() -> String {
    DEFAULT_OBSERVABILITY_ADDRESS.to_string()
}

fn default_created() -> String {
    "now".to_string()
}

fn default_true() -> bool {
    true
}

/// Contents of `packwright.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Content-addressed cache; `dirs::cache_dir()/packwright` when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub image: ImageSettings,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,

    /// Seconds since the epoch from `SOURCE_DATE_EPOCH`
    #[serde(skip)]
    pub source_date_epoch: Option<i64>,

    /// File the configuration was read from, for error reporting
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let (config, _warnings) = Self::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys)
    pub fn load_with_warnings(path: &Path) -> PipelineResult<(Self, Vec<ConfigWarning>)> {
        loader::load_with_warnings(path)
    }

    /// Binary target name
    pub fn binary_name(&self) -> PipelineResult<&str> {
        match self.package.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(self.error("package.name is required")),
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.resolve_path(&self.package.source)
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.resolve_path(&self.package.lockfile)
    }

    pub fn cache_root(&self) -> Option<PathBuf> {
        self.cache_dir.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            retries: self.fetch.retries,
            backoff: Duration::from_millis(self.fetch.backoff_ms),
            jobs: self.fetch.jobs,
        }
    }

    /// Profile table by name; built-ins are `release` and `test`
    pub fn profile(&self, name: &str) -> PipelineResult<ProfileSettings> {
        let builtin = match name {
            "release" => Some(ProfileConfig {
                release: true,
                run_tests: false,
                features: Vec::new(),
            }),
            "test" => Some(ProfileConfig {
                release: true,
                run_tests: true,
                features: Vec::new(),
            }),
            _ => None,
        };
        let profile = self
            .build
            .profiles
            .get(name)
            .cloned()
            .or(builtin)
            .ok_or_else(|| {
                let mut known: Vec<&str> = vec!["release", "test"];
                known.extend(self.build.profiles.keys().map(String::as_str));
                known.sort_unstable();
                known.dedup();
                self.error(format!(
                    "unknown build profile '{name}' (known: {})",
                    known.join(", ")
                ))
            })?;
        Ok(ProfileSettings {
            name: name.to_string(),
            release: profile.release,
            run_tests: profile.run_tests,
            features: profile.features,
        })
    }

    /// Build options for `profile`, or for `build.profile` when `None`
    pub fn build_options(&self, profile: Option<&str>) -> PipelineResult<BuildOptions> {
        let profile = profile.unwrap_or(&self.build.profile);
        Ok(BuildOptions {
            binary: self.binary_name()?.to_string(),
            profile: self.profile(profile)?,
            deny_unused_dependencies: self.build.deny_unused_dependencies,
            isolate_network: self.build.isolate_network,
        })
    }

    /// How the image `created` field is filled in
    ///
    /// `SOURCE_DATE_EPOCH` replaces `now`; an explicit pin always wins.
    pub fn created_timestamp(&self) -> PipelineResult<CreatedTimestamp> {
        match self.image.created.trim() {
            "now" => match self.source_date_epoch {
                Some(secs) => DateTime::<Utc>::from_timestamp(secs, 0)
                    .map(CreatedTimestamp::Pinned)
                    .ok_or_else(|| {
                        self.error(format!("SOURCE_DATE_EPOCH {secs} is out of range"))
                    }),
                None => Ok(CreatedTimestamp::Now),
            },
            "epoch" => Ok(CreatedTimestamp::epoch()),
            other => DateTime::parse_from_rfc3339(other)
                .map(|at| CreatedTimestamp::Pinned(at.with_timezone(&Utc)))
                .map_err(|e| {
                    self.error(format!(
                        "image.created '{other}' is not 'now', 'epoch' or RFC 3339: {e}"
                    ))
                }),
        }
    }

    /// Validated image specification
    pub fn image_spec(&self) -> PipelineResult<ImageSpec> {
        let binary = self.binary_name()?;
        let image = &self.image;
        let name = image.name.as_deref().unwrap_or(binary);

        let trust_bundle = match &image.trust_bundle {
            Some(path) => self.resolve_path(path),
            None => TRUST_BUNDLE_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file())
                .ok_or_else(|| {
                    self.error("image.trust_bundle is unset and no system bundle was found")
                })?,
        };
        let supervisor = match &image.supervisor {
            Some(path) => self.resolve_path(path),
            None => which::which("tini").map_err(|_| {
                self.error("image.supervisor is unset and `tini` is not on PATH")
            })?,
        };

        let mut builder = ImageSpec::builder(name, binary)
            .tag(&image.tag)
            .paths_to_link(image.paths_to_link.iter().cloned())
            .trust_bundle(trust_bundle, &image.trust_bundle_path)
            .supervisor(supervisor, &image.supervisor_path)
            .observability_address(&image.observability_address)
            .created(self.created_timestamp()?);
        for root in &image.base_paths {
            builder = builder.base_root(self.resolve_path(root));
        }
        for (key, value) in &image.env {
            builder = builder.env(key, value);
        }
        for port in &image.exposed_ports {
            let port: ExposedPort = port
                .parse()
                .map_err(|e: String| self.error(format!("image.exposed_ports: {e}")))?;
            builder = builder.expose(port);
        }
        builder.build()
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::Config {
            file: self
                .file
                .clone()
                .unwrap_or_else(|| PathBuf::from(super::CONFIG_FILE_NAME)),
            message: message.into(),
        }
    }
}
