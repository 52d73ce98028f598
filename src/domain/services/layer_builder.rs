//! Deterministic layer construction
//!
//! Entries are collected in memory and emitted as a tar in path order, with
//! every parent directory present and all variable metadata zeroed
//! (mtime 0, uid/gid 0, fixed modes). Identical inputs therefore always
//! produce byte-identical layers.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use tar::{EntryType, Header};

use crate::domain::entities::{ImageLayer, LayerRole};
use crate::error::{PipelineError, PipelineResult};

const DIR_MODE: u32 = 0o755;
const EXEC_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;
const LINK_MODE: u32 = 0o777;

#[derive(Debug, Clone, PartialEq, Eq)]
enum LayerEntry {
    Dir,
    File { bytes: Vec<u8>, executable: bool },
    Symlink { target: String },
}

/// Collects files for one layer
#[derive(Debug, Clone)]
pub struct LayerBuilder {
    role: LayerRole,
    entries: BTreeMap<String, LayerEntry>,
}

impl LayerBuilder {
    pub fn new(role: LayerRole) -> Self {
        Self {
            role,
            entries: BTreeMap::new(),
        }
    }

    /// Add a regular file, replacing any previous entry at `path`
    pub fn add_file(
        &mut self,
        path: &str,
        bytes: Vec<u8>,
        executable: bool,
    ) -> PipelineResult<()> {
        let key = self.prepare(path)?;
        self.entries
            .insert(key, LayerEntry::File { bytes, executable });
        Ok(())
    }

    /// Add a symlink, replacing any previous entry at `path`
    pub fn add_symlink(&mut self, path: &str, target: &str) -> PipelineResult<()> {
        let key = self.prepare(path)?;
        self.entries.insert(
            key,
            LayerEntry::Symlink {
                target: target.to_string(),
            },
        );
        Ok(())
    }

    /// Whether a non-directory entry exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        normalize(path)
            .ok()
            .and_then(|key| self.entries.get(&key))
            .is_some_and(|e| *e != LayerEntry::Dir)
    }

    /// Number of files and symlinks (directories excluded)
    pub fn file_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| **e != LayerEntry::Dir)
            .count()
    }

    /// Emit the layer tar
    pub fn finish(self) -> PipelineResult<ImageLayer> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, entry) in &self.entries {
            let mut header = Header::new_gnu();
            header.set_mtime(0);
            header.set_uid(0);
            header.set_gid(0);
            let result = match entry {
                LayerEntry::Dir => {
                    header.set_entry_type(EntryType::Directory);
                    header.set_mode(DIR_MODE);
                    header.set_size(0);
                    builder.append_data(&mut header, path, std::io::empty())
                }
                LayerEntry::File { bytes, executable } => {
                    header.set_entry_type(EntryType::Regular);
                    header.set_mode(if *executable { EXEC_MODE } else { FILE_MODE });
                    header.set_size(bytes.len() as u64);
                    builder.append_data(&mut header, path, bytes.as_slice())
                }
                LayerEntry::Symlink { target } => {
                    header.set_entry_type(EntryType::Symlink);
                    header.set_mode(LINK_MODE);
                    header.set_size(0);
                    builder.append_link(&mut header, path, target)
                }
            };
            result.map_err(|e| {
                PipelineError::assembly(format!(
                    "failed to add '{path}' to {} layer: {e}",
                    self.role.description()
                ))
            })?;
        }
        let tar = builder.into_inner().map_err(|e| {
            PipelineError::assembly(format!(
                "failed to finish {} layer: {e}",
                self.role.description()
            ))
        })?;
        Ok(ImageLayer::new(self.role, tar))
    }

    fn prepare(&mut self, path: &str) -> PipelineResult<String> {
        let key = normalize(path)?;
        if matches!(self.entries.get(&key), Some(LayerEntry::Dir)) {
            return Err(PipelineError::assembly(format!(
                "'{path}' is already a directory in the {} layer",
                self.role.description()
            )));
        }
        let mut parent = String::new();
        let parents: Vec<&str> = key.split('/').collect();
        for segment in &parents[..parents.len() - 1] {
            if !parent.is_empty() {
                parent.push('/');
            }
            parent.push_str(segment);
            match self.entries.get(&parent) {
                None => {
                    self.entries.insert(parent.clone(), LayerEntry::Dir);
                }
                Some(LayerEntry::Dir) => {}
                Some(_) => {
                    return Err(PipelineError::assembly(format!(
                        "'{parent}' is a file but '{path}' needs it as a directory"
                    )));
                }
            }
        }
        Ok(key)
    }
}

/// Turn an in-image absolute path into a relative tar path
fn normalize(path: &str) -> PipelineResult<String> {
    let mut segments = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(segment) => match segment.to_str() {
                Some(s) => segments.push(s),
                None => {
                    return Err(PipelineError::assembly(format!(
                        "in-image path '{path}' is not valid UTF-8"
                    )))
                }
            },
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PipelineError::assembly(format!(
                    "in-image path '{path}' must not contain '..'"
                )))
            }
        }
    }
    if segments.is_empty() {
        return Err(PipelineError::assembly(format!(
            "in-image path '{path}' is empty"
        )));
    }
    Ok(segments.join("/"))
}
