//! Image archive writer
//!
//! One tar that is both an OCI image layout and a docker archive, so either
//! `docker load` or `podman load` / skopeo `oci-archive:` can consume it:
//!
//! ```text
//! oci-layout
//! index.json
//! manifest.json              docker: Config, RepoTags, Layers
//! blobs/sha256/<hex>         layers, config, manifest
//! ```
//!
//! Entries are written in sorted order with zeroed metadata, so the archive
//! is as reproducible as the blobs it contains.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tar::{EntryType, Header};

use crate::domain::entities::{Descriptor, Image, MEDIA_TYPE_INDEX, MEDIA_TYPE_MANIFEST};
use crate::domain::ports::ImageWriter;
use crate::domain::value_objects::Digest;
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::fs::atomic_write;

const REF_NAME_ANNOTATION: &str = "org.opencontainers.image.ref.name";
const IMAGE_NAME_ANNOTATION: &str = "io.containerd.image.name";

#[derive(Debug, Clone, Copy, Default)]
pub struct OciArchiveWriter;

#[derive(Serialize)]
struct OciLayout {
    #[serde(rename = "imageLayoutVersion")]
    image_layout_version: &'static str,
}

#[derive(Serialize)]
struct OciIndex {
    #[serde(rename = "schemaVersion")]
    schema_version: u32,
    #[serde(rename = "mediaType")]
    media_type: &'static str,
    manifests: Vec<Descriptor>,
}

#[derive(Serialize)]
struct DockerManifestEntry {
    #[serde(rename = "Config")]
    config: String,
    #[serde(rename = "RepoTags")]
    repo_tags: Vec<String>,
    #[serde(rename = "Layers")]
    layers: Vec<String>,
}

/// `<name>-<tag>.tar`, with registry path separators flattened
pub fn archive_file_name(reference: &str) -> String {
    let (name, tag) = reference.rsplit_once(':').unwrap_or((reference, "latest"));
    format!("{}-{tag}.tar", name.replace('/', "_"))
}

fn blob_path(digest: &Digest) -> String {
    format!("blobs/sha256/{}", digest.hex())
}

impl OciArchiveWriter {
    pub fn new() -> Self {
        Self
    }

    /// Archive bytes for `image`
    pub fn render(&self, image: &Image) -> PipelineResult<Vec<u8>> {
        let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();

        for layer in image.layers() {
            files.insert(blob_path(layer.digest()), layer.tar().to_vec());
        }
        let config = image.config_blob();
        let manifest = image.manifest_blob();
        files.insert(blob_path(&config.digest), config.bytes.clone());
        files.insert(blob_path(&manifest.digest), manifest.bytes.clone());

        let tag = image
            .reference()
            .rsplit_once(':')
            .map(|(_, tag)| tag)
            .unwrap_or("latest");
        let mut descriptor = Descriptor::new(
            MEDIA_TYPE_MANIFEST,
            &manifest.digest,
            manifest.bytes.len() as u64,
        );
        descriptor
            .annotations
            .insert(REF_NAME_ANNOTATION.to_string(), tag.to_string());
        descriptor.annotations.insert(
            IMAGE_NAME_ANNOTATION.to_string(),
            image.reference().to_string(),
        );
        let index = OciIndex {
            schema_version: 2,
            media_type: MEDIA_TYPE_INDEX,
            manifests: vec![descriptor],
        };
        files.insert("index.json".to_string(), to_json(&index)?);
        files.insert(
            "oci-layout".to_string(),
            to_json(&OciLayout {
                image_layout_version: "1.0.0",
            })?,
        );

        let docker = vec![DockerManifestEntry {
            config: blob_path(&config.digest),
            repo_tags: vec![image.reference().to_string()],
            layers: image.layers().iter().map(|l| blob_path(l.digest())).collect(),
        }];
        files.insert("manifest.json".to_string(), to_json(&docker)?);

        let mut builder = tar::Builder::new(Vec::new());
        let mut dirs_written = false;
        for (path, bytes) in &files {
            if path.starts_with("blobs/") && !dirs_written {
                for dir in ["blobs", "blobs/sha256"] {
                    let mut header = normalized_header(EntryType::Directory, 0o755, 0);
                    builder
                        .append_data(&mut header, dir, std::io::empty())
                        .map_err(archive_err)?;
                }
                dirs_written = true;
            }
            let mut header = normalized_header(EntryType::Regular, 0o644, bytes.len() as u64);
            builder
                .append_data(&mut header, path, bytes.as_slice())
                .map_err(archive_err)?;
        }
        builder.into_inner().map_err(archive_err)
    }
}

impl ImageWriter for OciArchiveWriter {
    fn write(&self, image: &Image, out_dir: &Path) -> PipelineResult<PathBuf> {
        let bytes = self.render(image)?;
        let path = out_dir.join(archive_file_name(image.reference()));
        atomic_write(&path, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote image archive");
        Ok(path)
    }
}

fn normalized_header(kind: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

fn to_json<T: Serialize>(value: &T) -> PipelineResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| PipelineError::assembly(format!("serializing archive metadata: {e}")))
}

fn archive_err(e: std::io::Error) -> PipelineError {
    PipelineError::assembly(format!("writing image archive: {e}"))
}
