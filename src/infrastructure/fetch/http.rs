//! HTTP(S) origins via a shared `ureq` agent

use std::time::Duration;

use crate::domain::ports::{FetchError, Fetcher};
use crate::domain::value_objects::Origin;

/// Upper bound on a single dependency archive
const MAX_ARCHIVE_BYTES: u64 = 512 * 1024 * 1024;

/// Non-2xx statuses surface as `ureq::Error::StatusCode`
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, origin: &Origin) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .agent
            .get(origin.as_str())
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => FetchError::new(format!("HTTP status {code}")),
                other => FetchError::new(other.to_string()),
            })?;
        response
            .body_mut()
            .with_config()
            .limit(MAX_ARCHIVE_BYTES)
            .read_to_vec()
            .map_err(|e| FetchError::new(format!("reading body: {e}")))
    }
}
