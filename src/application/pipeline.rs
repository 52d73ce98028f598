//! Pipeline
//!
//! The fixed build graph behind the two CLI actions:
//!
//! - `build_package`: resolve → build → persist `<out>/bin/<name>`
//! - `build_image`: resolve → build → assemble → write the image archive
//!
//! Each stage only receives the previous stage's output, so a failed resolve
//! never reaches the toolchain and a failed build never reaches the
//! assembler. Outputs are published atomically once everything before them
//! succeeded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::application::assemble::AssembleUseCase;
use crate::application::build::{BuildOptions, BuildUseCase};
use crate::application::resolve::ResolveUseCase;
use crate::domain::entities::{BuildArtifact, Image, ImageSpec, LockOverride};
use crate::domain::ports::{ContentStore, Fetcher, ImageWriter, LockfileRepository, Toolchain};
use crate::error::PipelineResult;
use crate::infrastructure::fs::atomic_write_executable;

/// Inputs shared by both actions
#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub lockfile: &'a Path,
    pub overrides: &'a BTreeMap<String, LockOverride>,
    pub source_dir: &'a Path,
    pub out_dir: &'a Path,
    pub build: &'a BuildOptions,
}

/// What a successful run produced; rendered by `--json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub action: &'static str,
    pub dependencies: usize,
    pub binary: String,
    pub artifact_digest: String,
    pub toolchain: String,
    pub target: String,
    pub profile: String,
    pub source_digest: String,
    pub output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub reference: String,
    pub id: String,
    pub layers: Vec<String>,
    pub entrypoint: Vec<String>,
}

impl PipelineSummary {
    fn new(
        action: &'static str,
        dependencies: usize,
        artifact: &BuildArtifact,
        output: PathBuf,
    ) -> Self {
        let metadata = artifact.metadata();
        Self {
            action,
            dependencies,
            binary: artifact.name().to_string(),
            artifact_digest: artifact.digest().to_string(),
            toolchain: metadata.toolchain_version.clone(),
            target: metadata.target_triple.clone(),
            profile: metadata.profile.clone(),
            source_digest: metadata.source_digest.to_string(),
            output,
            image: None,
        }
    }

    fn with_image(mut self, image: &Image) -> Self {
        self.image = Some(ImageSummary {
            reference: image.reference().to_string(),
            id: image.id().to_string(),
            layers: image.layers().iter().map(|l| l.digest().to_string()).collect(),
            entrypoint: image.entrypoint().to_vec(),
        });
        self
    }
}

/// Resolve, build and (optionally) package in one pass
pub struct Pipeline<LR, F, S, T, W>
where
    LR: LockfileRepository,
    F: Fetcher,
    S: ContentStore,
    T: Toolchain,
    W: ImageWriter,
{
    resolve: ResolveUseCase<LR, F, S>,
    build: BuildUseCase<T>,
    assemble: AssembleUseCase,
    writer: W,
}

impl<LR, F, S, T, W> Pipeline<LR, F, S, T, W>
where
    LR: LockfileRepository,
    F: Fetcher,
    S: ContentStore,
    T: Toolchain,
    W: ImageWriter,
{
    pub fn new(resolve: ResolveUseCase<LR, F, S>, build: BuildUseCase<T>, writer: W) -> Self {
        Self {
            resolve,
            build,
            assemble: AssembleUseCase::new(),
            writer,
        }
    }

    /// Resolve and build, then publish the binary under `<out>/bin/`
    pub fn build_package(&self, inputs: &PipelineInputs<'_>) -> PipelineResult<PipelineSummary> {
        let (dependencies, artifact) = self.compile(inputs)?;

        let output = inputs.out_dir.join("bin").join(artifact.name());
        atomic_write_executable(&output, artifact.bytes())?;
        tracing::info!(path = %output.display(), "wrote package");

        Ok(PipelineSummary::new(
            "build-package",
            dependencies,
            &artifact,
            output,
        ))
    }

    /// Resolve, build and assemble, then write the image archive to `<out>`
    pub fn build_image(
        &self,
        inputs: &PipelineInputs<'_>,
        spec: &ImageSpec,
    ) -> PipelineResult<PipelineSummary> {
        let (dependencies, artifact) = self.compile(inputs)?;

        let image = self.assemble.execute(spec, &artifact)?;
        let output = self.writer.write(&image, inputs.out_dir)?;

        Ok(PipelineSummary::new("build-image", dependencies, &artifact, output).with_image(&image))
    }

    fn compile(&self, inputs: &PipelineInputs<'_>) -> PipelineResult<(usize, BuildArtifact)> {
        let dependencies = self.resolve.execute(inputs.lockfile, inputs.overrides)?;
        let artifact = self
            .build
            .execute(inputs.source_dir, &dependencies, inputs.build)?;
        Ok((dependencies.len(), artifact))
    }
}
