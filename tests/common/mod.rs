//! Common test utilities for packwright scenario and CLI tests.
//!
//! This module provides:
//! - Fixtures: crate tarballs, lock files and host image roots
//! - Doubles: in-memory fetcher and a counting toolchain
//! - `TestEnv`: a temp project plus helpers to run the CLI binary

#![allow(dead_code)]

pub mod doubles;
pub mod env;
pub mod fixtures;

pub use doubles::*;
pub use env::*;
pub use fixtures::*;
