//! Fetcher implementations
//!
//! `OriginRouter` dispatches on the origin's URL scheme:
//! `http`/`https` go to [`HttpFetcher`], `file` to [`FileFetcher`].

mod file;
mod http;

pub use file::FileFetcher;
pub use http::HttpFetcher;

use std::time::Duration;

use crate::domain::ports::{FetchError, Fetcher};
use crate::domain::value_objects::Origin;

/// Routes each origin to the fetcher for its scheme
pub struct OriginRouter {
    http: HttpFetcher,
    file: FileFetcher,
}

impl OriginRouter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpFetcher::new(timeout),
            file: FileFetcher,
        }
    }
}

impl Fetcher for OriginRouter {
    fn fetch(&self, origin: &Origin) -> Result<Vec<u8>, FetchError> {
        match origin.scheme().as_deref() {
            Some("http") | Some("https") => self.http.fetch(origin),
            Some("file") => self.file.fetch(origin),
            Some(other) => Err(FetchError::new(format!("unsupported scheme '{other}'"))),
            None => Err(FetchError::new(format!("'{origin}' is not a URL"))),
        }
    }
}
