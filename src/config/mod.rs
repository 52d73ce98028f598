//! Configuration module for packwright
//!
//! Settings are layered, highest priority first:
//! 1. CLI flags (`--profile`, `--out`)
//! 2. Environment variables (`PACKWRIGHT_*`, `SOURCE_DATE_EPOCH`)
//! 3. `packwright.toml`
//! 4. Built-in defaults

mod loader;
mod types;

pub use crate::domain::value_objects::ConfigWarning;

pub use loader::{apply_env, parse_with_warnings, with_env_overrides};
pub use types::{
    BuildConfig, Config, FetchConfig, ImageSettings, LockConfig, PackageConfig, ProfileConfig,
    TRUST_BUNDLE_CANDIDATES,
};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "packwright.toml";
