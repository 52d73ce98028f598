//! Vendor directory staging
//!
//! Turns a `VerifiedDependencySet` into a cargo directory source:
//!
//! ```text
//! <build>/vendor/<name>-<version>/...              unpacked crate
//! <build>/vendor/<name>-<version>/.cargo-checksum.json
//! <build>/cargo-home/config.toml                   source replacement, offline
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;
use thiserror::Error;

use crate::domain::entities::{VerifiedDependency, VerifiedDependencySet};
use crate::domain::value_objects::SourceKind;

/// Name of the replacement source in the generated cargo config
pub const VENDOR_SOURCE_NAME: &str = "vendored-sources";

#[derive(Debug, Error)]
pub enum VendorError {
    #[error("{id}: archive entry '{entry}' escapes the crate directory")]
    Traversal { id: String, entry: String },

    #[error("{id}: archive has no Cargo.toml at its top level")]
    MissingManifest { id: String },

    #[error("{id}: {source}")]
    Unpack {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("writing cargo config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of staging: where things landed
#[derive(Debug, Clone)]
pub struct VendoredSources {
    pub vendor_dir: PathBuf,
    pub cargo_home: PathBuf,
    pub crates: usize,
}

/// Unpack every dependency under `build_dir` and write the cargo config
pub fn stage(
    dependencies: &VerifiedDependencySet,
    build_dir: &Path,
) -> Result<VendoredSources, VendorError> {
    let vendor_dir = build_dir.join("vendor");
    let cargo_home = build_dir.join("cargo-home");
    fs::create_dir_all(&vendor_dir)?;
    fs::create_dir_all(&cargo_home)?;

    for dependency in dependencies.iter() {
        vendor_one(dependency, &vendor_dir)?;
    }

    let config = cargo_config(dependencies, &vendor_dir)?;
    fs::write(cargo_home.join("config.toml"), config)?;

    Ok(VendoredSources {
        vendor_dir,
        cargo_home,
        crates: dependencies.len(),
    })
}

fn vendor_one(dependency: &VerifiedDependency, vendor_dir: &Path) -> Result<(), VendorError> {
    let entry = dependency.entry();
    let id = entry.id().to_string();
    let dest = vendor_dir.join(&id);
    fs::create_dir_all(&dest)?;

    unpack_stripped(dependency.blob(), &dest, &id)?;
    if !dest.join("Cargo.toml").is_file() {
        return Err(VendorError::MissingManifest { id });
    }

    let package = match entry.source() {
        SourceKind::Registry { .. } => serde_json::Value::String(entry.digest().hex().to_string()),
        SourceKind::Git { .. } => serde_json::Value::Null,
    };
    let checksum = serde_json::json!({ "files": {}, "package": package });
    fs::write(dest.join(".cargo-checksum.json"), checksum.to_string())?;
    Ok(())
}

/// Unpack a gzipped tarball into `dest`, dropping the top-level directory
fn unpack_stripped(blob: &Path, dest: &Path, id: &str) -> Result<(), VendorError> {
    let unpack_err = |source: std::io::Error| VendorError::Unpack {
        id: id.to_string(),
        source,
    };
    let file = File::open(blob).map_err(unpack_err)?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    for entry in archive.entries().map_err(unpack_err)? {
        let mut entry = entry.map_err(unpack_err)?;
        let path = entry.path().map_err(unpack_err)?.into_owned();
        let Some(relative) = strip_top(&path).ok_or_else(|| VendorError::Traversal {
            id: id.to_string(),
            entry: path.display().to_string(),
        })?
        else {
            continue;
        };
        let target = dest.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => fs::create_dir_all(&target)?,
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                entry.unpack(&target).map_err(unpack_err)?;
            }
            EntryType::XGlobalHeader | EntryType::XHeader => {}
            other => {
                tracing::debug!(crate_id = id, entry = %path.display(), kind = ?other, "skipping non-file archive entry");
            }
        }
    }
    Ok(())
}

/// Path below the archive's top-level directory
///
/// `None` means the entry is unsafe; `Some(None)` is the top directory itself.
fn strip_top(path: &Path) -> Option<Option<PathBuf>> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(_)) => {}
        _ => return None,
    }
    let mut rest = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => rest.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    })
}

/// `config.toml` replacing every dependency source with the vendor directory
fn cargo_config(
    dependencies: &VerifiedDependencySet,
    vendor_dir: &Path,
) -> Result<String, VendorError> {
    let mut sources: BTreeMap<String, toml::Table> = BTreeMap::new();
    for dependency in dependencies.iter() {
        let source = dependency.entry().source();
        let key = source.replacement_key();
        if sources.contains_key(&key) {
            continue;
        }
        let mut table = toml::Table::new();
        match source {
            SourceKind::Registry { .. } if source.is_crates_io() => {}
            SourceKind::Registry { .. } => {
                if let Some(location) = source.registry_location() {
                    table.insert("registry".into(), location.into());
                }
            }
            SourceKind::Git { url, reference, .. } => {
                table.insert("git".into(), url.clone().into());
                if let Some((kind, value)) = reference.as_deref().and_then(|r| r.split_once('=')) {
                    if matches!(kind, "branch" | "tag" | "rev") {
                        table.insert(kind.into(), value.to_string().into());
                    }
                }
            }
        }
        table.insert("replace-with".into(), VENDOR_SOURCE_NAME.into());
        sources.insert(key, table);
    }

    let mut vendored = toml::Table::new();
    vendored.insert(
        "directory".into(),
        vendor_dir.display().to_string().into(),
    );

    let mut source_table = toml::Table::new();
    for (key, table) in sources {
        source_table.insert(key, toml::Value::Table(table));
    }
    source_table.insert(VENDOR_SOURCE_NAME.into(), toml::Value::Table(vendored));

    let mut net = toml::Table::new();
    net.insert("offline".into(), true.into());

    let mut root = toml::Table::new();
    root.insert("source".into(), toml::Value::Table(source_table));
    root.insert("net".into(), toml::Value::Table(net));

    toml::to_string(&root).map_err(|e| VendorError::Config(e.to_string()))
}
