//! Test doubles for the fetch and toolchain ports.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use packwright::application::{
    BuildOptions, BuildUseCase, Pipeline, PipelineInputs, ResolveOptions, ResolveUseCase,
};
use packwright::domain::entities::{BuildLog, LockOverride};
use packwright::domain::ports::{
    CompileFailure, CompileOutput, CompileRequest, FetchError, Fetcher, ProfileSettings, Toolchain,
};
use packwright::domain::value_objects::Origin;
use packwright::infrastructure::toolchain::vendor;
use packwright::infrastructure::{CargoLockRepository, DiskContentStore, OciArchiveWriter};

use super::fixtures::CrateFixture;

/// Serves fixed bytes per origin URL and records every request
#[derive(Default)]
pub struct MemoryFetcher {
    blobs: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the crate's own bytes at its default origin
    pub fn serving(mut self, krate: &CrateFixture) -> Self {
        self.blobs.insert(krate.origin(), krate.bytes.clone());
        self
    }

    /// Serve arbitrary bytes at `origin`
    pub fn with(mut self, origin: &str, bytes: Vec<u8>) -> Self {
        self.blobs.insert(origin.to_string(), bytes);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, origin: &Origin) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(origin.to_string());
        self.blobs
            .get(origin.as_str())
            .cloned()
            .ok_or_else(|| FetchError::new(format!("404 Not Found: {origin}")))
    }
}

/// Counts compile calls; optionally fails, optionally stages vendored sources
pub struct SpyToolchain {
    fail: bool,
    stage_vendor: bool,
    compiles: AtomicUsize,
    vendored: Mutex<Vec<String>>,
}

impl SpyToolchain {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            stage_vendor: false,
            compiles: AtomicUsize::new(0),
            vendored: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::succeeding()
        }
    }

    /// Unpack the verified set into a vendor dir before "compiling"
    pub fn vendoring() -> Self {
        Self {
            stage_vendor: true,
            ..Self::succeeding()
        }
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    /// Directory names found under `vendor/` during the last compile
    pub fn vendored(&self) -> Vec<String> {
        self.vendored.lock().unwrap().clone()
    }

    fn stage(&self, request: &CompileRequest<'_>, log: &mut BuildLog) -> Result<(), String> {
        let build_dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        let staged = vendor::stage(request.dependencies, build_dir.path()).map_err(|e| e.to_string())?;
        log.push_step("vendor", format!("staged {} crates", staged.crates));

        let mut names: Vec<String> = std::fs::read_dir(&staged.vendor_dir)
            .map_err(|e| e.to_string())?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().join("Cargo.toml").is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        *self.vendored.lock().unwrap() = names;
        Ok(())
    }
}

impl Toolchain for SpyToolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileFailure> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        let mut log = BuildLog::new();

        if self.stage_vendor {
            if let Err(reason) = self.stage(request, &mut log) {
                return Err(CompileFailure { reason, log });
            }
        }

        if self.fail {
            log.push_step(
                "cargo build",
                "error[E0425]: cannot find value `missing` in this scope\n --> src/main.rs:1:13",
            );
            return Err(CompileFailure {
                reason: "cargo build exited with status 101".to_string(),
                log,
            });
        }

        log.push_step("cargo build", "Finished `release` profile [optimized]");
        Ok(CompileOutput {
            binary: format!("\x7fELF {}", request.binary).into_bytes(),
            toolchain_version: "rustc 1.80.0 (051478957 2024-07-21)".to_string(),
            target_triple: "x86_64-unknown-linux-gnu".to_string(),
            log,
        })
    }
}

pub type TestPipeline<'a> = Pipeline<
    CargoLockRepository,
    &'a MemoryFetcher,
    DiskContentStore,
    &'a SpyToolchain,
    OciArchiveWriter,
>;

/// Real lock parsing, store and writer around the two doubles
pub fn pipeline<'a>(
    fetcher: &'a MemoryFetcher,
    toolchain: &'a SpyToolchain,
    cache: &Path,
) -> TestPipeline<'a> {
    Pipeline::new(
        ResolveUseCase::new(
            CargoLockRepository::new(),
            fetcher,
            DiskContentStore::new(cache),
            quick_retries(),
        ),
        BuildUseCase::new(toolchain),
        OciArchiveWriter::new(),
    )
}

/// One retry with a millisecond backoff
pub fn quick_retries() -> ResolveOptions {
    ResolveOptions {
        retries: 1,
        backoff: Duration::from_millis(1),
        jobs: 2,
    }
}

pub fn release_options() -> BuildOptions {
    BuildOptions {
        binary: "app".to_string(),
        profile: ProfileSettings {
            name: "release".to_string(),
            release: true,
            run_tests: false,
            features: Vec::new(),
        },
        deny_unused_dependencies: true,
        isolate_network: true,
    }
}

/// Inputs for the workspace rooted at `root`
pub fn inputs<'a>(
    lockfile: &'a Path,
    root: &'a Path,
    out: &'a Path,
    overrides: &'a std::collections::BTreeMap<String, LockOverride>,
    build: &'a BuildOptions,
) -> PipelineInputs<'a> {
    PipelineInputs {
        lockfile,
        overrides,
        source_dir: root,
        out_dir: out,
        build,
    }
}
