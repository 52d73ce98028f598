//! Reading base package roots from the host
//!
//! Relative symlinks are kept as symlinks, since they resolve inside the
//! image. Absolute symlinks point into the host (typically a package store)
//! and are dereferenced so the image carries the file itself.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// One file or symlink found under a base root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// Absolute in-image path
    pub path: String,
    pub kind: HostEntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEntryKind {
    File { source: PathBuf, executable: bool },
    Symlink { target: String },
}

/// Collect everything under `root/<prefix>`, mapped to `<prefix>/...`
///
/// A missing prefix directory yields no entries.
pub fn collect_tree(root: &Path, prefix: &str) -> std::io::Result<Vec<HostEntry>> {
    let prefix = prefix.trim_end_matches('/');
    let dir = root.join(prefix.trim_start_matches('/'));
    match fs::metadata(&dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(std::io::Error::other(format!(
                "{} is not a directory",
                dir.display()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    }
    let dir = fs::canonicalize(&dir)?;

    let walker = WalkBuilder::new(&dir)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&dir) else {
            continue;
        };
        let in_image = format!(
            "{prefix}/{}",
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        );

        let kind = if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            if target.is_absolute() {
                let resolved = fs::canonicalize(entry.path())?;
                let meta = fs::metadata(&resolved)?;
                if !meta.is_file() {
                    tracing::debug!(path = %in_image, "skipping absolute symlink to non-file");
                    continue;
                }
                HostEntryKind::File {
                    executable: is_executable(&meta),
                    source: resolved,
                }
            } else {
                HostEntryKind::Symlink {
                    target: target.to_string_lossy().into_owned(),
                }
            }
        } else if file_type.is_file() {
            let meta = entry.metadata().map_err(std::io::Error::other)?;
            HostEntryKind::File {
                source: entry.path().to_path_buf(),
                executable: is_executable(&meta),
            }
        } else {
            continue;
        };
        entries.push(HostEntry {
            path: in_image,
            kind,
        });
    }
    Ok(entries)
}

#[cfg(unix)]
pub fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.is_file() && meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
pub fn is_executable(meta: &fs::Metadata) -> bool {
    meta.is_file()
}
