//! Reusable test content: crate archives, lock files and a host image root.

use std::fs;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use packwright::domain::value_objects::Digest;
use tempfile::TempDir;

/// Source of every crates.io package in generated lock files
pub const CRATES_IO_SOURCE: &str = "registry+https://github.com/rust-lang/crates.io-index";

/// A `.crate` tarball as crates.io serves it
#[derive(Debug, Clone)]
pub struct CrateFixture {
    pub name: String,
    pub version: String,
    pub bytes: Vec<u8>,
}

impl CrateFixture {
    pub fn new(name: &str, version: &str) -> Self {
        let top = format!("{name}-{version}");
        let manifest = format!(
            "[package]\nname = \"{name}\"\nversion = \"{version}\"\nedition = \"2021\"\n"
        );
        let bytes = tarball(&[
            (format!("{top}/Cargo.toml"), manifest.into_bytes()),
            (format!("{top}/src/lib.rs"), b"pub fn answer() -> u32 { 42 }\n".to_vec()),
        ]);
        Self {
            name: name.to_string(),
            version: version.to_string(),
            bytes,
        }
    }

    /// `name-version`, the key used for lock overrides and vendor dirs
    pub fn id(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn digest(&self) -> Digest {
        Digest::of_bytes(&self.bytes)
    }

    pub fn checksum(&self) -> String {
        self.digest().hex().to_string()
    }

    /// Default download URL for a crates.io package
    pub fn origin(&self) -> String {
        format!(
            "https://static.crates.io/crates/{name}/{name}-{version}.crate",
            name = self.name,
            version = self.version
        )
    }
}

/// Gzipped tarball of `(path, contents)` pairs
pub fn tarball(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_slice())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// A version 4 `Cargo.lock` for root package `app` depending on `crates`
pub fn cargo_lock(crates: &[&CrateFixture]) -> String {
    let mut lock = String::from("# This file is automatically @generated by Cargo.\nversion = 4\n");
    lock.push_str("\n[[package]]\nname = \"app\"\nversion = \"0.1.0\"\n");
    if !crates.is_empty() {
        let deps: Vec<String> = crates.iter().map(|c| format!(" \"{}\",", c.name)).collect();
        lock.push_str(&format!("dependencies = [\n{}\n]\n", deps.join("\n")));
    }
    for krate in crates {
        lock.push_str(&format!(
            "\n[[package]]\nname = \"{}\"\nversion = \"{}\"\nsource = \"{CRATES_IO_SOURCE}\"\nchecksum = \"{}\"\n",
            krate.name,
            krate.version,
            krate.checksum()
        ));
    }
    lock
}

#[cfg(unix)]
pub fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) {}

/// Write `bytes` under `root`, creating parents
pub fn write_file(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, bytes).unwrap();
    path
}

/// Host directories an image is assembled from
pub struct HostImageRoot {
    pub dir: TempDir,
}

impl HostImageRoot {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Self { dir };
        make_executable(&write_file(root.path(), "base/bin/sh", b"#!sh"));
        write_file(root.path(), "certs/ca-bundle.crt", b"-----BEGIN CERTIFICATE-----\n");
        make_executable(&write_file(root.path(), "tini", b"tini"));
        root
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn base(&self) -> PathBuf {
        self.path().join("base")
    }

    pub fn trust_bundle(&self) -> PathBuf {
        self.path().join("certs/ca-bundle.crt")
    }

    pub fn supervisor(&self) -> PathBuf {
        self.path().join("tini")
    }
}

/// A minimal cargo project: `Cargo.lock` plus `src/main.rs`
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new(lock: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "Cargo.lock", lock.as_bytes());
        write_file(
            dir.path(),
            "Cargo.toml",
            b"[package]\nname = \"app\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
        );
        write_file(dir.path(), "src/main.rs", b"fn main() {}\n");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn lockfile(&self) -> PathBuf {
        self.path().join("Cargo.lock")
    }

    pub fn out(&self) -> PathBuf {
        self.path().join("out")
    }
}
