//! Image entities - content-addressed layers and the assembled image
//!
//! The config and manifest documents follow the OCI image specification
//! (`application/vnd.oci.image.config.v1+json`,
//! `application/vnd.oci.image.manifest.v1+json`).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::value_objects::Digest;

pub const MEDIA_TYPE_LAYER: &str = "application/vnd.oci.image.layer.v1.tar";
pub const MEDIA_TYPE_CONFIG: &str = "application/vnd.oci.image.config.v1+json";
pub const MEDIA_TYPE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// Position and purpose of a layer; layers are always stacked in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerRole {
    /// Shell and core utilities
    Base,
    /// Trusted certificate bundle
    Trust,
    /// Compiled artifact and supervisor
    App,
}

impl LayerRole {
    pub fn description(self) -> &'static str {
        match self {
            LayerRole::Base => "base utilities",
            LayerRole::Trust => "trusted certificate bundle",
            LayerRole::App => "artifact and supervisor",
        }
    }
}

/// Immutable filesystem snapshot as an uncompressed tar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLayer {
    role: LayerRole,
    tar: Vec<u8>,
    digest: Digest,
}

impl ImageLayer {
    pub fn new(role: LayerRole, tar: Vec<u8>) -> Self {
        let digest = Digest::of_bytes(&tar);
        Self { role, tar, digest }
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn tar(&self) -> &[u8] {
        &self.tar
    }

    /// Digest of the tar bytes; also the layer's diff id
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn size(&self) -> u64 {
        self.tar.len() as u64
    }
}

/// Reference to a blob inside a manifest or index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub digest: String,
    pub size: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    pub fn new(media_type: &str, digest: &Digest, size: u64) -> Self {
        Self {
            media_type: media_type.to_string(),
            digest: digest.to_string(),
            size,
            annotations: BTreeMap::new(),
        }
    }
}

/// Runtime section of the image config
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeConfig {
    #[serde(rename = "Env")]
    pub env: Vec<String>,
    #[serde(rename = "Entrypoint")]
    pub entrypoint: Vec<String>,
    #[serde(rename = "ExposedPorts")]
    pub exposed_ports: BTreeMap<String, EmptyObject>,
}

/// Serializes as `{}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmptyObject {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub kind: String,
    pub diff_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub created: String,
    pub created_by: String,
}

/// OCI image config document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageConfig {
    pub created: String,
    pub architecture: String,
    pub os: String,
    pub config: RuntimeConfig,
    pub rootfs: RootFs,
    pub history: Vec<HistoryEntry>,
}

/// OCI image manifest document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageManifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub config: Descriptor,
    pub layers: Vec<Descriptor>,
}

/// A blob as it is stored: bytes plus their digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub digest: Digest,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            digest: Digest::of_bytes(&bytes),
            bytes,
        }
    }
}

/// Fully assembled image, ready to be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    reference: String,
    layers: Vec<ImageLayer>,
    config: ImageConfig,
    config_blob: Blob,
    manifest_blob: Blob,
}

impl Image {
    pub fn new(
        reference: String,
        layers: Vec<ImageLayer>,
        config: ImageConfig,
        config_blob: Blob,
        manifest_blob: Blob,
    ) -> Self {
        Self {
            reference,
            layers,
            config,
            config_blob,
            manifest_blob,
        }
    }

    /// `name:tag`
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Layers in stacking order (base, trust, app)
    pub fn layers(&self) -> &[ImageLayer] {
        &self.layers
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    pub fn entrypoint(&self) -> &[String] {
        &self.config.config.entrypoint
    }

    pub fn config_blob(&self) -> &Blob {
        &self.config_blob
    }

    pub fn manifest_blob(&self) -> &Blob {
        &self.manifest_blob
    }

    /// Image id (digest of the config blob)
    pub fn id(&self) -> &Digest {
        &self.config_blob.digest
    }
}
