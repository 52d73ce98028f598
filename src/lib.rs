//! packwright - reproducible build pipeline
//!
//! Turns a Cargo project and its lock file into a container image in one
//! fixed graph: every dependency is fetched and checked against its pinned
//! SHA-256 digest, the source tree is compiled offline against the verified
//! set, and the executable is packaged with a process supervisor and a
//! trusted-certificate bundle into deterministic image layers.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-exports for convenience
pub use application::{Pipeline, PipelineInputs, PipelineSummary};
pub use config::Config;
pub use error::{PipelineError, PipelineResult, Stage};
