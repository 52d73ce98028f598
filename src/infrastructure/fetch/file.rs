//! `file://` origins, used for local mirrors and offline builds

use std::path::Path;

use crate::domain::ports::{FetchError, Fetcher};
use crate::domain::value_objects::Origin;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl Fetcher for FileFetcher {
    fn fetch(&self, origin: &Origin) -> Result<Vec<u8>, FetchError> {
        let path = origin
            .as_str()
            .strip_prefix("file://")
            .ok_or_else(|| FetchError::new(format!("'{origin}' is not a file:// URL")))?;
        // `file://localhost/x` and `file:///x` both name `/x`
        let path = path.strip_prefix("localhost").unwrap_or(path);
        std::fs::read(Path::new(path)).map_err(|e| FetchError::new(format!("{path}: {e}")))
    }
}
