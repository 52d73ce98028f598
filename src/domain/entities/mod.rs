//! Domain Entities
//!
//! - `Lockfile` - pinned dependencies and their digests
//! - `BuildArtifact` - the compiled executable
//! - `ImageSpec` - validated image declaration
//! - `Image` / `ImageLayer` - assembled, content-addressed image

mod artifact;
mod image;
pub mod image_spec;
mod lockfile;

pub use artifact::{BuildArtifact, BuildLog, BuildMetadata};
pub use image::{
    Blob, Descriptor, EmptyObject, HistoryEntry, Image, ImageConfig, ImageLayer, ImageManifest,
    LayerRole, RootFs, RuntimeConfig, MEDIA_TYPE_CONFIG, MEDIA_TYPE_INDEX, MEDIA_TYPE_LAYER,
    MEDIA_TYPE_MANIFEST,
};
pub use image_spec::{CreatedTimestamp, ImageSpec, ImageSpecBuilder};
pub use lockfile::{
    LockEntry, LockOverride, Lockfile, VerifiedDependency, VerifiedDependencySet,
};
