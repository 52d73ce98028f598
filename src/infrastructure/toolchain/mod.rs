//! Toolchain implementations

mod cargo;
pub mod vendor;

pub use cargo::{CargoToolchain, ENV_ALLOWLIST};
