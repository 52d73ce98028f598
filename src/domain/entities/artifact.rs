//! Build artifact entity - the single executable a build produces

use crate::domain::value_objects::Digest;

/// Captured toolchain output, one section per invoked step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildLog {
    steps: Vec<(String, String)>,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the combined output of one toolchain step
    pub fn push_step(&mut self, step: impl Into<String>, output: impl Into<String>) {
        self.steps.push((step.into(), output.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(|(_, output)| output.trim().is_empty())
    }

    pub fn steps(&self) -> impl Iterator<Item = (&str, &str)> {
        self.steps.iter().map(|(s, o)| (s.as_str(), o.as_str()))
    }

    /// Whole log rendered as text
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (step, output) in &self.steps {
            out.push_str("==> ");
            out.push_str(step);
            out.push('\n');
            out.push_str(output);
            if !output.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }

    /// Last `n` lines of the rendered log
    pub fn tail(&self, n: usize) -> String {
        let rendered = self.render();
        let lines: Vec<&str> = rendered.lines().collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.steps.iter().any(|(_, output)| output.contains(needle))
    }
}

/// Provenance of a build artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    /// `rustc` release line, e.g. `rustc 1.79.0 (129f3b996 2024-06-10)`
    pub toolchain_version: String,
    /// Target triple the binary was compiled for
    pub target_triple: String,
    /// Build profile name from configuration
    pub profile: String,
    /// Digest of the source tree that was compiled
    pub source_digest: Digest,
}

/// The compiled executable plus its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    name: String,
    bytes: Vec<u8>,
    digest: Digest,
    metadata: BuildMetadata,
    log: BuildLog,
}

impl BuildArtifact {
    pub fn new(
        name: impl Into<String>,
        bytes: Vec<u8>,
        metadata: BuildMetadata,
        log: BuildLog,
    ) -> Self {
        let digest = Digest::of_bytes(&bytes);
        Self {
            name: name.into(),
            bytes,
            digest,
            metadata,
            log,
        }
    }

    /// Binary name (file name inside the image)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    pub fn log(&self) -> &BuildLog {
        &self.log
    }

    /// OCI architecture name for the artifact's target triple
    pub fn architecture(&self) -> &'static str {
        let arch = self
            .metadata
            .target_triple
            .split('-')
            .next()
            .unwrap_or_default();
        match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "armv7" | "arm" => "arm",
            "i686" | "i586" => "386",
            "riscv64gc" | "riscv64" => "riscv64",
            "powerpc64le" => "ppc64le",
            "s390x" => "s390x",
            _ => "unknown",
        }
    }
}
