//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod content_store;
pub mod fetcher;
pub mod image_writer;
pub mod lockfile_repository;
pub mod toolchain;

pub use content_store::{ContentStore, StoreError, StoreResult};
pub use fetcher::{FetchError, Fetcher};
pub use image_writer::ImageWriter;
pub use lockfile_repository::LockfileRepository;
pub use toolchain::{CompileFailure, CompileOutput, CompileRequest, ProfileSettings, Toolchain};
