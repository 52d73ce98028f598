//! Fetcher port - abstraction over downloading dependency bytes
//!
//! Implementations only move bytes; verification happens in the resolver,
//! so a fetcher never needs to know what digest it is expected to produce.

use crate::domain::value_objects::Origin;

/// Failure to obtain bytes from an origin
///
/// Always treated as transient: the resolver retries with backoff before
/// giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError(pub String);

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for FetchError {}

/// Downloads raw bytes for an origin
///
/// Shared across fetch worker threads.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, origin: &Origin) -> Result<Vec<u8>, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    fn fetch(&self, origin: &Origin) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(origin)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, origin: &Origin) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(origin)
    }
}
