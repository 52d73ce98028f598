//! Toolchain port - hermetic compilation of a source tree
//!
//! The request carries a `VerifiedDependencySet`, so a toolchain can only
//! ever be handed dependencies that passed the resolver's gate.

use std::path::Path;

use crate::domain::entities::{BuildLog, VerifiedDependencySet};

/// Settings of one named build profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSettings {
    pub name: String,
    /// Optimized build
    pub release: bool,
    /// Run the test suite after building
    pub run_tests: bool,
    /// Cargo features to enable
    pub features: Vec<String>,
}

/// Everything a toolchain needs for one build
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub source_dir: &'a Path,
    pub dependencies: &'a VerifiedDependencySet,
    /// Name of the binary target to produce
    pub binary: &'a str,
    pub profile: &'a ProfileSettings,
    /// Turn unused-dependency warnings into hard errors
    pub deny_unused_dependencies: bool,
    /// Run inside a private network namespace when available
    pub isolate_network: bool,
}

/// Successful toolchain run
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub binary: Vec<u8>,
    pub toolchain_version: String,
    pub target_triple: String,
    pub log: BuildLog,
}

/// Failed toolchain run, with whatever was logged up to the failure
#[derive(Debug, Clone)]
pub struct CompileFailure {
    pub reason: String,
    pub log: BuildLog,
}

/// Compiler toolchain
pub trait Toolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileFailure>;
}

impl<T: Toolchain + ?Sized> Toolchain for &T {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileFailure> {
        (**self).compile(request)
    }
}
