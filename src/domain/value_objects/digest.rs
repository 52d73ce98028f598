//! Content Digest Value Object
//!
//! A validated, immutable SHA-256 digest. Used to pin dependencies in the
//! lock file, to key the content-addressed cache, and to address image blobs.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest as _, Sha256};

/// Error returned when a digest string is not well-formed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestParseError(String);

impl fmt::Display for DigestParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a sha256 digest (expected 64 hex characters, optionally prefixed with 'sha256:')",
            self.0
        )
    }
}

impl std::error::Error for DigestParseError {}

/// SHA-256 content digest
///
/// Always stored as lowercase hex; displayed with the `sha256:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// Prefix for SHA-256 digests
    pub const PREFIX: &'static str = "sha256:";

    const HEX_LEN: usize = 64;

    /// Parse a digest from `sha256:<hex>` or bare `<hex>` form
    pub fn parse(s: &str) -> Result<Self, DigestParseError> {
        let hex = s.strip_prefix(Self::PREFIX).unwrap_or(s);
        let well_formed = hex.len() == Self::HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit());
        if !well_formed {
            return Err(DigestParseError(s.to_string()));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Compute the digest of raw bytes
    pub fn of_bytes(content: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(content)))
    }

    /// Build a digest from a finished hasher
    pub fn from_hasher(hasher: Sha256) -> Self {
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex part without prefix
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// Check whether `content` hashes to this digest
    pub fn verifies(&self, content: &[u8]) -> bool {
        Self::of_bytes(content) == *self
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
