//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `repositories/` - Lock file repository (`Cargo.lock`)
//! - `fetch/` - HTTP(S) and `file://` fetchers
//! - `cache/` - On-disk content-addressed store
//! - `toolchain/` - Hermetic cargo invocation and vendoring
//! - `image/` - Base root collection and archive output
//! - `source` - Source tree digest

pub mod cache;
pub mod fetch;
pub mod fs;
pub mod image;
pub mod repositories;
pub mod source;
pub mod toolchain;

// Re-export for convenience
pub use cache::DiskContentStore;
pub use fetch::OriginRouter;
pub use image::OciArchiveWriter;
pub use repositories::CargoLockRepository;
pub use toolchain::CargoToolchain;
