//! On-disk content-addressed store
//!
//! Layout:
//!
//! ```text
//! <root>/blobs/sha256/<hex>    verified bytes
//! <root>/locks/<hex>.lock      per-digest advisory lock
//! ```
//!
//! Blobs are only ever inserted whole (temp file + rename) and are re-hashed
//! on every read, so a truncated or tampered cache entry is detected rather
//! than trusted.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use sha2::{Digest as _, Sha256};

use crate::domain::ports::{ContentStore, StoreError, StoreResult};
use crate::domain::value_objects::Digest;
use crate::infrastructure::fs::atomic_write_new;

#[derive(Debug, Clone)]
pub struct DiskContentStore {
    root: PathBuf,
}

impl DiskContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$XDG_CACHE_HOME/packwright` (or the platform equivalent)
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .map(|d| d.join("packwright"))
            .unwrap_or_else(|| PathBuf::from(".packwright-cache"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root.join("blobs").join("sha256").join(digest.hex())
    }

    fn lock(&self, digest: &Digest) -> StoreResult<File> {
        let dir = self.root.join("locks");
        fs::create_dir_all(&dir)?;
        let file = File::create(dir.join(format!("{}.lock", digest.hex())))?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

impl ContentStore for DiskContentStore {
    fn get(&self, digest: &Digest) -> StoreResult<Option<PathBuf>> {
        let path = self.blob_path(digest);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if hash_reader(file)? != *digest {
            return Err(StoreError::Corrupted {
                digest: digest.clone(),
            });
        }
        Ok(Some(path))
    }

    fn put(&self, digest: &Digest, bytes: &[u8]) -> StoreResult<PathBuf> {
        let path = self.blob_path(digest);
        let lock = self.lock(digest)?;
        let result = atomic_write_new(&path, bytes);
        let _ = lock.unlock();
        result?;
        Ok(path)
    }

    fn evict(&self, digest: &Digest) -> StoreResult<()> {
        let lock = self.lock(digest)?;
        let result = match fs::remove_file(self.blob_path(digest)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        };
        let _ = lock.unlock();
        result
    }
}

fn hash_reader(mut reader: impl Read) -> std::io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest::from_hasher(hasher))
}
