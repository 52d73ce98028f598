//! Hermetic `cargo` toolchain
//!
//! Each build gets a private temp directory holding the vendored sources, an
//! isolated `CARGO_HOME` and the target directory. Cargo runs with a cleared
//! environment, offline and locked, with proxies pointed at a closed port so
//! that anything slipping past `--offline` fails fast instead of reaching the
//! network. When requested and available, `unshare` adds a private network
//! namespace on top.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::domain::entities::BuildLog;
use crate::domain::ports::{CompileFailure, CompileOutput, CompileRequest, Toolchain};

use super::vendor;

/// Host variables passed through to the toolchain
pub const ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "RUSTUP_HOME", "RUSTUP_TOOLCHAIN", "LANG"];

/// Closed local port; any proxied connection is refused immediately
const DEAD_PROXY: &str = "http://127.0.0.1:9";

const DENY_UNUSED_DEPENDENCIES: &str = "-D unused-crate-dependencies";

/// Log lines showing cargo tried to reach the network
const NETWORK_MARKERS: &[&str] = &[
    "attempting to make an HTTP request, but --offline was specified",
    "Updating crates.io index",
    "Updating git repository",
    "Downloading crates",
    "failed to download",
    "network failure seems to have happened",
];

/// Cargo-based implementation of the `Toolchain` port
#[derive(Debug, Clone)]
pub struct CargoToolchain {
    cargo: PathBuf,
    rustc: PathBuf,
    unshare: Option<PathBuf>,
}

impl CargoToolchain {
    /// Locate `cargo`, `rustc` and (optionally) `unshare` on `PATH`
    pub fn detect() -> Result<Self, which::Error> {
        Ok(Self {
            cargo: which::which("cargo")?,
            rustc: which::which("rustc")?,
            unshare: which::which("unshare").ok(),
        })
    }

    pub fn new(cargo: PathBuf, rustc: PathBuf) -> Self {
        Self {
            cargo,
            rustc,
            unshare: None,
        }
    }

    /// `rustc -vV`: release line and host triple
    fn rustc_info(&self, log: &mut BuildLog) -> Result<(String, String), String> {
        let mut command = Command::new(&self.rustc);
        command.arg("-vV");
        apply_base_env(&mut command);
        let output = command
            .output()
            .map_err(|e| format!("cannot run {}: {e}", self.rustc.display()))?;
        let text = combined(&output);
        log.push_step("rustc -vV", text.clone());
        if !output.status.success() {
            return Err(format!("rustc -vV exited with {}", output.status));
        }
        parse_rustc_info(&text).ok_or_else(|| "unrecognized `rustc -vV` output".to_string())
    }

    /// Whether `unshare --net` actually works here (user namespaces may be off)
    fn network_namespace(&self, isolate: bool) -> Option<&Path> {
        let unshare = self.unshare.as_deref().filter(|_| isolate)?;
        let probe = Command::new(unshare)
            .args(["--net", "--map-root-user", "true"])
            .env_clear()
            .output();
        match probe {
            Ok(output) if output.status.success() => Some(unshare),
            _ => {
                tracing::warn!("unshare is present but cannot create a network namespace; relying on offline mode");
                None
            }
        }
    }

    fn cargo_command(
        &self,
        unshare: Option<&Path>,
        request: &CompileRequest<'_>,
        env: &ToolchainEnv,
    ) -> Command {
        let mut command = match unshare {
            Some(unshare) => {
                let mut c = Command::new(unshare);
                c.args(["--net", "--map-root-user", "--"]).arg(&self.cargo);
                c
            }
            None => Command::new(&self.cargo),
        };
        apply_base_env(&mut command);
        command
            .current_dir(request.source_dir)
            .env("CARGO_HOME", &env.cargo_home)
            .env("CARGO_TARGET_DIR", &env.target_dir)
            .env("CARGO_NET_OFFLINE", "true")
            .env("CARGO_TERM_COLOR", "never");
        for proxy in ["HTTP_PROXY", "HTTPS_PROXY", "ALL_PROXY", "http_proxy", "https_proxy"] {
            command.env(proxy, DEAD_PROXY);
        }
        if request.deny_unused_dependencies {
            command.env("RUSTFLAGS", DENY_UNUSED_DEPENDENCIES);
        }
        command
    }

    fn run_step(
        &self,
        step: &str,
        mut command: Command,
        log: &mut BuildLog,
    ) -> Result<(), String> {
        tracing::info!(step, "running toolchain step");
        let output = command
            .output()
            .map_err(|e| format!("cannot run {step}: {e}"))?;
        let text = combined(&output);
        log.push_step(step, text.clone());
        if let Some(marker) = network_attempt(&text) {
            return Err(format!(
                "hermetic violation: {step} attempted network access ({marker})"
            ));
        }
        if !output.status.success() {
            return Err(format!("{step} exited with {}", output.status));
        }
        Ok(())
    }
}

struct ToolchainEnv {
    cargo_home: PathBuf,
    target_dir: PathBuf,
}

impl Toolchain for CargoToolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileFailure> {
        let mut log = BuildLog::new();
        let fail = |reason: String, log: BuildLog| CompileFailure { reason, log };

        let work = match tempfile::Builder::new()
            .prefix("packwright-build-")
            .tempdir()
        {
            Ok(dir) => dir,
            Err(e) => {
                log.push_step("prepare", e.to_string());
                return Err(fail(format!("cannot create build directory: {e}"), log));
            }
        };

        let (toolchain_version, target_triple) = match self.rustc_info(&mut log) {
            Ok(info) => info,
            Err(reason) => {
                if log.is_empty() {
                    log.push_step("rustc -vV", reason.clone());
                }
                return Err(fail(reason, log));
            }
        };

        let vendored = match vendor::stage(request.dependencies, work.path()) {
            Ok(vendored) => vendored,
            Err(e) => {
                log.push_step("vendor", e.to_string());
                return Err(fail(format!("vendoring failed: {e}"), log));
            }
        };
        log.push_step(
            "vendor",
            format!(
                "vendored {} crate(s) into {}",
                vendored.crates,
                vendored.vendor_dir.display()
            ),
        );

        let env = ToolchainEnv {
            cargo_home: vendored.cargo_home,
            target_dir: work.path().join("target"),
        };
        let unshare = self.network_namespace(request.isolate_network);

        let mut build = self.cargo_command(unshare, request, &env);
        build.args(cargo_args("build", request));
        build.args(["--bin", request.binary]);
        if let Err(reason) = self.run_step("cargo build", build, &mut log) {
            return Err(fail(reason, log));
        }

        if request.profile.run_tests {
            let mut test = self.cargo_command(unshare, request, &env);
            test.args(cargo_args("test", request));
            if let Err(reason) = self.run_step("cargo test", test, &mut log) {
                return Err(fail(reason, log));
            }
        }

        let profile_dir = if request.profile.release {
            "release"
        } else {
            "debug"
        };
        let binary_path = env.target_dir.join(profile_dir).join(request.binary);
        let binary = match std::fs::read(&binary_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log.push_step("collect", format!("{}: {e}", binary_path.display()));
                return Err(fail(
                    format!("binary '{}' was not produced", request.binary),
                    log,
                ));
            }
        };

        Ok(CompileOutput {
            binary,
            toolchain_version,
            target_triple,
            log,
        })
    }
}

fn cargo_args(subcommand: &str, request: &CompileRequest<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![subcommand.into(), "--offline".into(), "--locked".into()];
    if request.profile.release {
        args.push("--release".into());
    }
    if !request.profile.features.is_empty() {
        args.push("--features".into());
        args.push(request.profile.features.join(",").into());
    }
    args
}

fn apply_base_env(command: &mut Command) {
    command.env_clear();
    for key in ENV_ALLOWLIST {
        if let Some(value) = std::env::var_os(key) {
            command.env(key, value);
        }
    }
}

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// First network marker on one of cargo's own status or error lines
///
/// rustc diagnostics quote user source behind a `|` gutter; those lines are
/// never considered, so string literals in the project cannot trip the check.
fn network_attempt(log: &str) -> Option<&'static str> {
    log.lines()
        .map(str::trim_start)
        .filter(|line| !is_snippet_line(line))
        .filter(|line| {
            line.starts_with("Updating ")
                || line.starts_with("Downloading ")
                || line.starts_with("error:")
                || NETWORK_MARKERS.iter().any(|marker| line.starts_with(marker))
        })
        .find_map(|line| {
            NETWORK_MARKERS
                .iter()
                .copied()
                .find(|marker| line.contains(marker))
        })
}

/// `3 |     let x = ...;` or `  |     ^^^`
fn is_snippet_line(line: &str) -> bool {
    line.trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start()
        .starts_with('|')
}

fn parse_rustc_info(text: &str) -> Option<(String, String)> {
    let version = text.lines().find(|l| l.starts_with("rustc "))?.trim();
    let host = text
        .lines()
        .find_map(|l| l.strip_prefix("host: "))?
        .trim();
    Some((version.to_string(), host.to_string()))
}
