//! ContentStore port - content-addressed cache of verified blobs
//!
//! Entries are keyed by their own digest and written once, so a store can be
//! shared by concurrent builds without coordination beyond an atomic insert.

use std::path::PathBuf;

use crate::domain::value_objects::Digest;

/// Result type for content store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Content store errors
#[derive(Debug)]
pub enum StoreError {
    /// Stored bytes no longer hash to their key
    Corrupted { digest: Digest },
    /// I/O error
    Io(std::io::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Corrupted { digest } => {
                write!(f, "cached blob {} does not match its digest", digest)
            }
            StoreError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {}

/// Content-addressed blob store
pub trait ContentStore: Send + Sync {
    /// Path of the blob for `digest`, if present and intact
    ///
    /// Returns `Err(Corrupted)` when the stored bytes do not hash to `digest`.
    fn get(&self, digest: &Digest) -> StoreResult<Option<PathBuf>>;

    /// Insert bytes that are already known to hash to `digest`
    ///
    /// Inserting an existing digest is a no-op.
    fn put(&self, digest: &Digest, bytes: &[u8]) -> StoreResult<PathBuf>;

    /// Remove a (corrupted) blob
    fn evict(&self, digest: &Digest) -> StoreResult<()>;
}

impl<S: ContentStore + ?Sized> ContentStore for &S {
    fn get(&self, digest: &Digest) -> StoreResult<Option<PathBuf>> {
        (**self).get(digest)
    }

    fn put(&self, digest: &Digest, bytes: &[u8]) -> StoreResult<PathBuf> {
        (**self).put(digest, bytes)
    }

    fn evict(&self, digest: &Digest) -> StoreResult<()> {
        (**self).evict(digest)
    }
}
