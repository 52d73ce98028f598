//! Error types for packwright
//!
//! Uses `thiserror` for library errors; the binary wraps them in `anyhow`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::entities::BuildLog;

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Resolve,
    Build,
    Assemble,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Resolve => "resolve",
            Stage::Build => "build",
            Stage::Assemble => "assemble",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Lock file fails to parse, or an entry is missing required fields
    #[error("malformed lock entry '{entry}': {reason}")]
    MalformedLockEntry { entry: String, reason: String },

    /// Fetched bytes disagree with the pinned digest
    #[error("hash mismatch for '{id}': expected {expected}, got {actual}")]
    HashMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    /// Origin unavailable after all retry attempts
    #[error("failed to fetch '{id}' from {origin} after {attempts} attempt(s): {message}")]
    Fetch {
        id: String,
        origin: String,
        attempts: u32,
        message: String,
    },

    /// Toolchain reported failure
    #[error("compilation failed: {reason}")]
    Compile { reason: String, log: BuildLog },

    /// Image declarations are inconsistent or inputs are missing
    #[error("image assembly failed: {reason}")]
    Assembly { reason: String },

    /// Invalid configuration file or value
    #[error("invalid configuration in {file}: {message}")]
    Config { file: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn malformed(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedLockEntry {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    pub fn assembly(reason: impl Into<String>) -> Self {
        Self::Assembly {
            reason: reason.into(),
        }
    }

    /// Stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::MalformedLockEntry { .. }
            | PipelineError::HashMismatch { .. }
            | PipelineError::Fetch { .. } => Stage::Resolve,
            PipelineError::Compile { .. } => Stage::Build,
            PipelineError::Assembly { .. } => Stage::Assemble,
            PipelineError::Config { .. } | PipelineError::Io(_) => Stage::Config,
        }
    }

    /// Process exit status for this error (always non-zero)
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config { .. } | PipelineError::Io(_) => 2,
            PipelineError::MalformedLockEntry { .. } => 3,
            PipelineError::HashMismatch { .. } => 4,
            PipelineError::Fetch { .. } => 5,
            PipelineError::Compile { .. } => 6,
            PipelineError::Assembly { .. } => 7,
        }
    }

    /// Captured toolchain log, if this is a compile error
    pub fn build_log(&self) -> Option<&BuildLog> {
        match self {
            PipelineError::Compile { log, .. } => Some(log),
            _ => None,
        }
    }
}
