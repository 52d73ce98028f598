//! Cargo.lock repository
//!
//! Implements the LockfileRepository port for cargo's TOML lock format
//! (versions 3 and 4). Workspace members have no `source` and are skipped;
//! every other package must be pinned either by its `checksum` or by a hash
//! override from `packwright.toml`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::domain::entities::{LockEntry, LockOverride, Lockfile};
use crate::domain::ports::LockfileRepository;
use crate::domain::value_objects::{DependencyId, Digest, Origin, SourceKind};
use crate::error::{PipelineError, PipelineResult};

/// Reads `Cargo.lock` files
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoLockRepository;

impl CargoLockRepository {
    pub fn new() -> Self {
        Self
    }

    /// Parse lock file `content` and apply `overrides`
    pub fn parse(
        &self,
        content: &str,
        overrides: &BTreeMap<String, LockOverride>,
    ) -> PipelineResult<Lockfile> {
        let raw: TomlCargoLock = toml::from_str(content)
            .map_err(|e| PipelineError::malformed("<lockfile>", e.message().to_string()))?;

        let version = raw.version.ok_or_else(|| {
            PipelineError::malformed(
                "<lockfile>",
                "missing `version`; regenerate the lock file with a current cargo",
            )
        })?;

        let mut used_overrides = BTreeSet::new();
        let mut entries = Vec::new();
        for (index, package) in raw.package.into_iter().enumerate() {
            let Some(source) = package.source.as_deref() else {
                continue;
            };
            let (name, version) = match (package.name, package.version) {
                (Some(name), Some(version)) if !name.is_empty() && !version.is_empty() => {
                    (name, version)
                }
                (name, _) => {
                    let label = name.unwrap_or_else(|| format!("package #{}", index + 1));
                    return Err(PipelineError::malformed(label, "missing name or version"));
                }
            };
            let id = DependencyId::new(name, version);
            let label = id.to_string();

            let source = SourceKind::parse(source).ok_or_else(|| {
                PipelineError::malformed(&label, format!("unsupported source '{source}'"))
            })?;

            let override_entry = overrides.get(&label);
            if override_entry.is_some() {
                used_overrides.insert(label.clone());
            }

            let checksum = package
                .checksum
                .as_deref()
                .map(|c| parse_digest(&label, "checksum", c))
                .transpose()?;
            let pinned = override_entry
                .and_then(|o| o.hash.as_deref())
                .map(|h| parse_digest(&label, "override hash", h))
                .transpose()?;

            let digest = match (checksum, pinned) {
                (Some(checksum), Some(pinned)) if checksum != pinned => {
                    return Err(PipelineError::malformed(
                        &label,
                        format!("override hash {pinned} disagrees with lock checksum {checksum}"),
                    ));
                }
                (Some(digest), _) | (None, Some(digest)) => digest,
                (None, None) if source.is_git() => {
                    return Err(PipelineError::malformed(
                        &label,
                        "git dependencies carry no checksum; pin one with a hash override",
                    ));
                }
                (None, None) => {
                    return Err(PipelineError::malformed(&label, "missing checksum"));
                }
            };

            let mut entry = LockEntry::new(id, source, digest);
            if let Some(origin) = override_entry.and_then(|o| o.origin.as_deref()) {
                if origin.trim().is_empty() {
                    return Err(PipelineError::malformed(&label, "override origin is empty"));
                }
                entry = entry.with_origin_override(Origin::new(origin));
            }
            entries.push(entry);
        }

        if let Some(unused) = overrides.keys().find(|k| !used_overrides.contains(*k)) {
            return Err(PipelineError::malformed(
                unused.as_str(),
                "override does not match any locked dependency",
            ));
        }

        Lockfile::from_entries(version, entries)
    }
}

impl LockfileRepository for CargoLockRepository {
    fn load(
        &self,
        path: &Path,
        overrides: &BTreeMap<String, LockOverride>,
    ) -> PipelineResult<Lockfile> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::malformed(
                path.display().to_string(),
                format!("cannot read lock file: {e}"),
            )
        })?;
        self.parse(&content, overrides)
    }
}

fn parse_digest(label: &str, field: &str, value: &str) -> PipelineResult<Digest> {
    Digest::parse(value).map_err(|e| PipelineError::malformed(label, format!("{field}: {e}")))
}

/// TOML representation of `Cargo.lock`
#[derive(Debug, Deserialize)]
struct TomlCargoLock {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    package: Vec<TomlPackage>,
}

/// One `[[package]]` table; `dependencies` and other keys are ignored
#[derive(Debug, Deserialize)]
struct TomlPackage {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
}
