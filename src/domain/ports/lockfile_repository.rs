//! LockfileRepository port - abstraction for reading lock files
//!
//! This trait allows the resolver to load lock files without knowing about
//! the on-disk format. The pipeline never writes lock files.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::entities::{LockOverride, Lockfile};
use crate::error::PipelineResult;

/// Abstract repository for lock file loading
pub trait LockfileRepository {
    /// Load and validate the lock file at `path`, applying `overrides`
    ///
    /// Any parse or validation failure is a `MalformedLockEntry`.
    fn load(
        &self,
        path: &Path,
        overrides: &BTreeMap<String, LockOverride>,
    ) -> PipelineResult<Lockfile>;
}
