//! Source tree digest
//!
//! SHA-256 over every file in the tree, in sorted relative-path order. Each
//! file contributes `path \0 length content`, so renames and content edits
//! both change the digest. Ignore files are not consulted: cargo compiles
//! gitignored inputs (generated sources, local assets) too, so they belong in
//! the provenance. Only `.git` and the top-level `target/` directory are
//! skipped; builds use a private target directory and never read either.

use std::path::Path;

use ignore::WalkBuilder;
use sha2::{Digest as _, Sha256};

use crate::domain::value_objects::Digest;

/// Digest the source tree rooted at `root`
pub fn digest_tree(root: &Path) -> std::io::Result<Digest> {
    let mut files = Vec::new();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| {
            entry.file_name() != ".git" && !(entry.depth() == 1 && entry.file_name() == "target")
        })
        .build();

    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        files.push(relative);
    }
    files.sort();

    let mut hasher = Sha256::new();
    for relative in &files {
        let content = std::fs::read(root.join(relative))?;
        hasher.update(normalized(relative).as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(&content);
    }
    Ok(Digest::from_hasher(hasher))
}

/// Forward-slash form, so the digest does not depend on the host OS
fn normalized(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
