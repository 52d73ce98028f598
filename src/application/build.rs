//! Build Use Case
//!
//! Compiles a source tree against a `VerifiedDependencySet`. The set can only
//! come out of the resolver, so there is no way to reach the toolchain with
//! unverified dependencies.

use std::path::Path;

use crate::domain::entities::{BuildArtifact, BuildLog, BuildMetadata, VerifiedDependencySet};
use crate::domain::ports::{CompileRequest, ProfileSettings, Toolchain};
use crate::error::{PipelineError, PipelineResult};
use crate::infrastructure::source::digest_tree;

/// What to build and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Binary target name
    pub binary: String,
    pub profile: ProfileSettings,
    pub deny_unused_dependencies: bool,
    pub isolate_network: bool,
}

pub struct BuildUseCase<T: Toolchain> {
    toolchain: T,
}

impl<T: Toolchain> BuildUseCase<T> {
    pub fn new(toolchain: T) -> Self {
        Self { toolchain }
    }

    pub fn execute(
        &self,
        source_dir: &Path,
        dependencies: &VerifiedDependencySet,
        options: &BuildOptions,
    ) -> PipelineResult<BuildArtifact> {
        let source_digest = digest_tree(source_dir).map_err(|e| {
            let mut log = BuildLog::new();
            log.push_step("source", format!("{}: {e}", source_dir.display()));
            PipelineError::Compile {
                reason: format!("cannot read source tree {}", source_dir.display()),
                log,
            }
        })?;
        tracing::info!(
            source = %source_dir.display(),
            digest = %source_digest,
            profile = %options.profile.name,
            dependencies = dependencies.len(),
            "compiling"
        );

        let request = CompileRequest {
            source_dir,
            dependencies,
            binary: &options.binary,
            profile: &options.profile,
            deny_unused_dependencies: options.deny_unused_dependencies,
            isolate_network: options.isolate_network,
        };
        let output = self.toolchain.compile(&request).map_err(|failure| {
            let mut log = failure.log;
            if log.is_empty() {
                log.push_step("toolchain", failure.reason.clone());
            }
            PipelineError::Compile {
                reason: failure.reason,
                log,
            }
        })?;

        if output.binary.is_empty() {
            let mut log = output.log;
            log.push_step("collect", format!("binary '{}' is empty", options.binary));
            return Err(PipelineError::Compile {
                reason: format!("toolchain produced an empty '{}' binary", options.binary),
                log,
            });
        }

        let artifact = BuildArtifact::new(
            options.binary.clone(),
            output.binary,
            BuildMetadata {
                toolchain_version: output.toolchain_version,
                target_triple: output.target_triple,
                profile: options.profile.name.clone(),
                source_digest,
            },
            output.log,
        );
        tracing::info!(
            binary = artifact.name(),
            digest = %artifact.digest(),
            bytes = artifact.bytes().len(),
            "build succeeded"
        );
        Ok(artifact)
    }
}
