//! Lock file entity - pins every dependency to a content digest
//!
//! The lock file is read once per build and never mutated by the pipeline.
//! It's a pure data structure - parsing is handled by `LockfileRepository`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{DependencyId, Digest, Origin, SourceKind};
use crate::error::{PipelineError, PipelineResult};

/// Hash and/or origin pinned outside the lock file, keyed by `name-version`
///
/// Git dependencies carry no checksum in the lock file, so their hash must be
/// supplied this way. For registry dependencies the hash, if given, must agree
/// with the lock file's checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockOverride {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

/// A single pinned dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntry {
    id: DependencyId,
    source: SourceKind,
    digest: Digest,
    origin_override: Option<Origin>,
}

impl LockEntry {
    pub fn new(id: DependencyId, source: SourceKind, digest: Digest) -> Self {
        Self {
            id,
            source,
            digest,
            origin_override: None,
        }
    }

    /// Fetch from `origin` instead of the default inferred from the source
    pub fn with_origin_override(mut self, origin: Origin) -> Self {
        self.origin_override = Some(origin);
        self
    }

    pub fn id(&self) -> &DependencyId {
        &self.id
    }

    pub fn source(&self) -> &SourceKind {
        &self.source
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn origin_override(&self) -> Option<&Origin> {
        self.origin_override.as_ref()
    }

    /// Origin to fetch from: the override when present, else the default
    pub fn origin(&self) -> Option<Origin> {
        self.origin_override
            .clone()
            .or_else(|| self.source.default_origin(&self.id))
    }
}

/// Ordered collection of lock entries plus the file's format version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lockfile {
    version: u32,
    entries: BTreeMap<DependencyId, LockEntry>,
}

impl Lockfile {
    /// Lock file format versions this pipeline understands
    pub const SUPPORTED_VERSIONS: &'static [u32] = &[3, 4];

    /// Build a lock file, enforcing identifier uniqueness and fetchability
    pub fn from_entries(
        version: u32,
        entries: impl IntoIterator<Item = LockEntry>,
    ) -> PipelineResult<Self> {
        if !Self::SUPPORTED_VERSIONS.contains(&version) {
            return Err(PipelineError::malformed(
                "<lockfile>",
                format!(
                    "unsupported lock file version {version} (supported: {:?})",
                    Self::SUPPORTED_VERSIONS
                ),
            ));
        }

        let mut map = BTreeMap::new();
        for entry in entries {
            if entry.origin().is_none() {
                return Err(PipelineError::malformed(
                    entry.id().to_string(),
                    format!(
                        "no download origin can be inferred for source '{}'; set an origin override",
                        entry.source().source_string()
                    ),
                ));
            }
            let id = entry.id().clone();
            if map.insert(id.clone(), entry).is_some() {
                return Err(PipelineError::malformed(
                    id.to_string(),
                    "identifier appears more than once",
                ));
            }
        }

        Ok(Self {
            version,
            entries: map,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: &DependencyId) -> Option<&LockEntry> {
        self.entries.get(id)
    }

    /// Entries in identifier order
    pub fn entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.values()
    }
}

/// A lock entry whose bytes matched the pinned digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedDependency {
    entry: LockEntry,
    blob: PathBuf,
}

impl VerifiedDependency {
    pub fn entry(&self) -> &LockEntry {
        &self.entry
    }

    /// Location of the verified bytes in the content store
    pub fn blob(&self) -> &Path {
        &self.blob
    }
}

/// The complete set of verified dependencies for one build
///
/// Only the resolver can construct this, and only once every entry of the
/// lock file has been verified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedDependencySet {
    dependencies: Vec<VerifiedDependency>,
}

impl VerifiedDependencySet {
    pub(crate) fn new(mut verified: Vec<(LockEntry, PathBuf)>) -> Self {
        verified.sort_by(|a, b| a.0.id().cmp(b.0.id()));
        Self {
            dependencies: verified
                .into_iter()
                .map(|(entry, blob)| VerifiedDependency { entry, blob })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VerifiedDependency> {
        self.dependencies.iter()
    }
}
