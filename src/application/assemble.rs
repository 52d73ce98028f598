//! Assemble Use Case
//!
//! Stacks the image from three deterministic layers, in this order:
//! 1. base - files under `paths_to_link` from each base root (first root wins)
//! 2. trust - the certificate bundle
//! 3. app - the artifact and the supervisor
//!
//! then derives the OCI config and manifest. Only the config's `created`
//! field can differ between runs with identical inputs.

use std::fs;
use std::path::Path;

use chrono::SecondsFormat;

use crate::domain::entities::{
    Blob, BuildArtifact, Descriptor, EmptyObject, HistoryEntry, Image, ImageConfig, ImageLayer,
    ImageManifest, ImageSpec, LayerRole, RootFs, RuntimeConfig, MEDIA_TYPE_CONFIG,
    MEDIA_TYPE_LAYER, MEDIA_TYPE_MANIFEST,
};
use crate::domain::services::LayerBuilder;
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::image::{collect_tree, is_executable, HostEntryKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleUseCase;

impl AssembleUseCase {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, spec: &ImageSpec, artifact: &BuildArtifact) -> PipelineResult<Image> {
        let expected_artifact = format!("/bin/{}", artifact.name());
        if spec.artifact_path() != expected_artifact {
            return Err(PipelineError::assembly(format!(
                "image expects artifact at {} but the build produced '{}'",
                spec.artifact_path(),
                artifact.name()
            )));
        }
        let architecture = artifact.architecture();
        if architecture == "unknown" {
            return Err(PipelineError::assembly(format!(
                "no image architecture for target '{}'",
                artifact.metadata().target_triple
            )));
        }
        check_supervisor(spec.supervisor())?;

        let layers = vec![
            base_layer(spec)?,
            trust_layer(spec)?,
            app_layer(spec, artifact)?,
        ];
        for layer in &layers {
            tracing::debug!(
                layer = layer.role().description(),
                digest = %layer.digest(),
                bytes = layer.size(),
                "built layer"
            );
        }

        let created = spec
            .created()
            .resolve()
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let config = ImageConfig {
            created: created.clone(),
            architecture: architecture.to_string(),
            os: "linux".to_string(),
            config: RuntimeConfig {
                env: spec.env().iter().map(|(k, v)| format!("{k}={v}")).collect(),
                entrypoint: spec.entrypoint().to_vec(),
                exposed_ports: spec
                    .exposed_ports()
                    .iter()
                    .map(|port| (port.to_string(), EmptyObject {}))
                    .collect(),
            },
            rootfs: RootFs {
                kind: "layers".to_string(),
                diff_ids: layers.iter().map(|l| l.digest().to_string()).collect(),
            },
            history: layers
                .iter()
                .map(|l| HistoryEntry {
                    created: created.clone(),
                    created_by: format!("packwright: {}", l.role().description()),
                })
                .collect(),
        };
        let config_blob = Blob::new(to_json(&config)?);

        let manifest = ImageManifest {
            schema_version: 2,
            media_type: MEDIA_TYPE_MANIFEST.to_string(),
            config: Descriptor::new(
                MEDIA_TYPE_CONFIG,
                &config_blob.digest,
                config_blob.bytes.len() as u64,
            ),
            layers: layers
                .iter()
                .map(|l| Descriptor::new(MEDIA_TYPE_LAYER, l.digest(), l.size()))
                .collect(),
        };
        let manifest_blob = Blob::new(to_json(&manifest)?);

        let image = Image::new(spec.reference(), layers, config, config_blob, manifest_blob);
        tracing::info!(
            image = image.reference(),
            id = %image.id(),
            "assembled image"
        );
        Ok(image)
    }
}

/// The supervisor must be startable, or the container could never run
pub fn check_supervisor(path: &Path) -> PipelineResult<()> {
    let meta = fs::metadata(path).map_err(|e| {
        PipelineError::assembly(format!("supervisor {}: {e}", path.display()))
    })?;
    if !meta.is_file() {
        return Err(PipelineError::assembly(format!(
            "supervisor {} is not a regular file",
            path.display()
        )));
    }
    if !is_executable(&meta) {
        return Err(PipelineError::assembly(format!(
            "supervisor {} is not executable",
            path.display()
        )));
    }
    Ok(())
}

fn base_layer(spec: &ImageSpec) -> PipelineResult<ImageLayer> {
    if spec.base_roots().is_empty() {
        return Err(PipelineError::assembly("no base package roots declared"));
    }
    let mut builder = LayerBuilder::new(LayerRole::Base);
    for root in spec.base_roots() {
        if !root.is_dir() {
            return Err(PipelineError::assembly(format!(
                "base root {} does not exist",
                root.display()
            )));
        }
        for prefix in spec.paths_to_link() {
            let entries = collect_tree(root, prefix).map_err(|e| {
                PipelineError::assembly(format!(
                    "reading {prefix} under base root {}: {e}",
                    root.display()
                ))
            })?;
            for entry in entries {
                if builder.contains(&entry.path) {
                    tracing::debug!(path = %entry.path, root = %root.display(), "shadowed by earlier base root");
                    continue;
                }
                match entry.kind {
                    HostEntryKind::File { source, executable } => {
                        let bytes = read_host(&source)?;
                        builder.add_file(&entry.path, bytes, executable)?;
                    }
                    HostEntryKind::Symlink { target } => {
                        builder.add_symlink(&entry.path, &target)?;
                    }
                }
            }
        }
    }
    if builder.file_count() == 0 {
        return Err(PipelineError::assembly(format!(
            "base roots contain nothing under {}",
            spec.paths_to_link().join(", ")
        )));
    }
    builder.finish()
}

fn trust_layer(spec: &ImageSpec) -> PipelineResult<ImageLayer> {
    let bundle = read_host(spec.trust_bundle())?;
    if bundle.is_empty() {
        return Err(PipelineError::assembly(format!(
            "trust bundle {} is empty",
            spec.trust_bundle().display()
        )));
    }
    let mut builder = LayerBuilder::new(LayerRole::Trust);
    builder.add_file(spec.trust_bundle_path(), bundle, false)?;
    builder.finish()
}

fn app_layer(spec: &ImageSpec, artifact: &BuildArtifact) -> PipelineResult<ImageLayer> {
    let mut builder = LayerBuilder::new(LayerRole::App);
    builder.add_file(spec.artifact_path(), artifact.bytes().to_vec(), true)?;
    builder.add_file(spec.supervisor_path(), read_host(spec.supervisor())?, true)?;
    builder.finish()
}

fn read_host(path: &Path) -> PipelineResult<Vec<u8>> {
    fs::read(path).map_err(|e| PipelineError::assembly(format!("{}: {e}", path.display())))
}

fn to_json<T: serde::Serialize>(value: &T) -> PipelineResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| PipelineError::assembly(format!("serializing: {e}")))
}
