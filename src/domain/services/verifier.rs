//! Digest verification for fetched dependency bytes
//!
//! A mismatch is a supply-chain integrity failure: it is reported, never
//! retried and never papered over with another origin.

use crate::domain::entities::LockEntry;
use crate::domain::value_objects::Digest;
use crate::error::{PipelineError, PipelineResult};

/// Verify `bytes` against the digest pinned in `entry`
pub fn verify(entry: &LockEntry, bytes: &[u8]) -> PipelineResult<()> {
    let actual = Digest::of_bytes(bytes);
    if actual == *entry.digest() {
        Ok(())
    } else {
        Err(PipelineError::HashMismatch {
            id: entry.id().to_string(),
            expected: entry.digest().to_string(),
            actual: actual.to_string(),
        })
    }
}
