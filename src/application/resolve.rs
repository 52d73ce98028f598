//! Resolve Use Case
//!
//! Turns a lock file into a `VerifiedDependencySet`:
//! 1. Load and validate the lock file
//! 2. For each entry, serve from the content store or fetch from its origin
//! 3. Verify every fetched blob against its pinned digest
//! 4. Hand out the set only if every entry verified
//!
//! Fetches run on a bounded pool of scoped threads. Work is taken in
//! identifier order and a failure only cancels entries that sort after it, so
//! when several entries would fail the reported error is always the one for
//! the smallest identifier, whatever the scheduling.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::domain::entities::{LockEntry, LockOverride, Lockfile, VerifiedDependencySet};
use crate::domain::ports::{ContentStore, Fetcher, LockfileRepository, StoreError};
use crate::domain::services::verify;
use crate::domain::value_objects::DependencyId;
use crate::error::{PipelineError, PipelineResult};

/// Retry and concurrency knobs for fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Extra attempts after the first failed fetch
    pub retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub backoff: Duration,
    /// Concurrent fetch workers
    pub jobs: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_millis(250),
            jobs: 4,
        }
    }
}

/// Resolve use case - the only producer of `VerifiedDependencySet`
pub struct ResolveUseCase<LR, F, S>
where
    LR: LockfileRepository,
    F: Fetcher,
    S: ContentStore,
{
    lockfile_repo: LR,
    fetcher: F,
    store: S,
    options: ResolveOptions,
}

/// Shared state of one resolve run
struct Run<'a> {
    entries: Vec<&'a LockEntry>,
    next: AtomicUsize,
    verified: Mutex<Vec<(LockEntry, PathBuf)>>,
    failures: Mutex<BTreeMap<DependencyId, PipelineError>>,
}

impl Run<'_> {
    /// Whether an entry sorting before `id` has already failed
    fn cancelled(&self, id: &DependencyId) -> bool {
        self.failures
            .lock()
            .map(|f| f.keys().next().is_some_and(|first| first < id))
            .unwrap_or(true)
    }
}

impl<LR, F, S> ResolveUseCase<LR, F, S>
where
    LR: LockfileRepository,
    F: Fetcher,
    S: ContentStore,
{
    pub fn new(lockfile_repo: LR, fetcher: F, store: S, options: ResolveOptions) -> Self {
        Self {
            lockfile_repo,
            fetcher,
            store,
            options,
        }
    }

    /// Load the lock file at `path` and resolve it
    pub fn execute(
        &self,
        path: &Path,
        overrides: &BTreeMap<String, LockOverride>,
    ) -> PipelineResult<VerifiedDependencySet> {
        let lockfile = self.lockfile_repo.load(path, overrides)?;
        tracing::info!(
            path = %path.display(),
            version = lockfile.version(),
            dependencies = lockfile.len(),
            "loaded lock file"
        );
        self.resolve(&lockfile)
    }

    /// Fetch and verify every entry of `lockfile`; all or nothing
    pub fn resolve(&self, lockfile: &Lockfile) -> PipelineResult<VerifiedDependencySet> {
        let run = Run {
            entries: lockfile.entries().collect(),
            next: AtomicUsize::new(0),
            verified: Mutex::new(Vec::with_capacity(lockfile.len())),
            failures: Mutex::new(BTreeMap::new()),
        };
        let workers = self.options.jobs.max(1).min(run.entries.len());
        let fetching = Fetching {
            fetcher: &self.fetcher,
            store: &self.store,
            options: self.options,
            run: &run,
        };

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| fetching.worker());
            }
        });

        let failures = run
            .failures
            .into_inner()
            .map_err(|_| PipelineError::Io(std::io::Error::other("fetch worker panicked")))?;
        if let Some((id, error)) = failures.into_iter().next() {
            tracing::error!(dependency = %id, "dependency resolution failed");
            return Err(error);
        }

        let verified = run
            .verified
            .into_inner()
            .map_err(|_| PipelineError::Io(std::io::Error::other("fetch worker panicked")))?;
        tracing::info!(dependencies = verified.len(), "all dependencies verified");
        Ok(VerifiedDependencySet::new(verified))
    }
}

/// Per-run view shared by the fetch workers
struct Fetching<'a, F, S> {
    fetcher: &'a F,
    store: &'a S,
    options: ResolveOptions,
    run: &'a Run<'a>,
}

impl<F: Fetcher, S: ContentStore> Fetching<'_, F, S> {
    fn worker(&self) {
        let run = self.run;
        loop {
            let index = run.next.fetch_add(1, Ordering::SeqCst);
            let Some(entry) = run.entries.get(index).copied() else {
                return;
            };
            if run.cancelled(entry.id()) {
                return;
            }
            match self.resolve_entry(entry) {
                Ok(Some(blob)) => {
                    if let Ok(mut verified) = run.verified.lock() {
                        verified.push((entry.clone(), blob));
                    }
                }
                Ok(None) => return,
                Err(error) => {
                    if let Ok(mut failures) = run.failures.lock() {
                        failures.insert(entry.id().clone(), error);
                    }
                }
            }
        }
    }

    /// Blob path for `entry`, or `None` when cancelled mid-retry
    fn resolve_entry(&self, entry: &LockEntry) -> PipelineResult<Option<PathBuf>> {
        let id = entry.id();
        let digest = entry.digest();

        match self.store.get(digest) {
            Ok(Some(blob)) => {
                tracing::debug!(dependency = %id, "cache hit");
                return Ok(Some(blob));
            }
            Ok(None) => {}
            Err(StoreError::Corrupted { .. }) => {
                tracing::warn!(dependency = %id, digest = %digest, "evicting corrupted cache entry");
                self.store.evict(digest).map_err(store_error)?;
            }
            Err(StoreError::Io(e)) => return Err(PipelineError::Io(e)),
        }

        let origin = entry.origin().ok_or_else(|| {
            PipelineError::malformed(id.to_string(), "no origin to fetch from")
        })?;
        let attempts = self.options.retries.saturating_add(1);
        let mut delay = self.options.backoff;

        let mut attempt = 1;
        loop {
            tracing::info!(dependency = %id, origin = %origin, attempt, "fetching");
            let e = match self.fetcher.fetch(&origin) {
                Ok(bytes) => {
                    verify(entry, &bytes)?;
                    let blob = self.store.put(digest, &bytes).map_err(store_error)?;
                    tracing::debug!(dependency = %id, bytes = bytes.len(), "verified and cached");
                    return Ok(Some(blob));
                }
                Err(e) => e,
            };
            if attempt >= attempts {
                return Err(PipelineError::Fetch {
                    id: id.to_string(),
                    origin: origin.to_string(),
                    attempts,
                    message: e.to_string(),
                });
            }
            tracing::warn!(
                dependency = %id,
                attempt,
                error = %e,
                retry_in_ms = delay.as_millis() as u64,
                "fetch failed, retrying"
            );
            thread::sleep(delay);
            delay = delay.saturating_mul(2);
            attempt += 1;
            if self.run.cancelled(id) {
                return Ok(None);
            }
        }
    }
}

fn store_error(e: StoreError) -> PipelineError {
    match e {
        StoreError::Io(e) => PipelineError::Io(e),
        other => PipelineError::Io(std::io::Error::other(other.to_string())),
    }
}
