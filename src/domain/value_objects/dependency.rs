//! Dependency identity and source value objects
//!
//! - `DependencyId`: `name-version`, unique within a lock file
//! - `SourceKind`: where a locked package comes from (registry or git)
//! - `Origin`: the URL bytes are fetched from

use std::fmt;

/// Identifier of a locked dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyId {
    name: String,
    version: String,
}

impl DependencyId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Where a locked package is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A crate registry (`registry+<index>` or `sparse+<index>`)
    Registry {
        protocol: RegistryProtocol,
        index: String,
    },
    /// A git repository pinned to a commit (`git+<url>?<reference>#<commit>`)
    ///
    /// `reference` is the query cargo records (`branch=main`, `tag=v1`,
    /// `rev=abc`), if any.
    Git {
        url: String,
        reference: Option<String>,
        commit: String,
    },
}

/// How a registry index is served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryProtocol {
    /// Git-cloned index (`registry+`)
    Git,
    /// HTTP sparse index (`sparse+`)
    Sparse,
}

impl RegistryProtocol {
    pub fn prefix(self) -> &'static str {
        match self {
            RegistryProtocol::Git => "registry+",
            RegistryProtocol::Sparse => "sparse+",
        }
    }
}

impl SourceKind {
    /// Index URL of crates.io, as it appears in lock files
    pub const CRATES_IO_INDEX: &'static str = "https://github.com/rust-lang/crates.io-index";
    /// Sparse index URL of crates.io
    pub const CRATES_IO_SPARSE_INDEX: &'static str = "https://index.crates.io/";

    /// crates.io through its git index, the default in lock files
    pub fn crates_io() -> Self {
        SourceKind::Registry {
            protocol: RegistryProtocol::Git,
            index: Self::CRATES_IO_INDEX.to_string(),
        }
    }

    /// Parse the `source` field of a lock file package
    pub fn parse(source: &str) -> Option<Self> {
        for protocol in [RegistryProtocol::Git, RegistryProtocol::Sparse] {
            if let Some(index) = source.strip_prefix(protocol.prefix()) {
                return Some(SourceKind::Registry {
                    protocol,
                    index: index.to_string(),
                });
            }
        }
        let rest = source.strip_prefix("git+")?;
        let (url_and_query, commit) = rest.split_once('#')?;
        let (url, reference) = match url_and_query.split_once('?') {
            Some((url, query)) if !query.is_empty() => (url, Some(query.to_string())),
            Some((url, _)) => (url, None),
            None => (url_and_query, None),
        };
        if url.is_empty() || commit.is_empty() {
            return None;
        }
        Some(SourceKind::Git {
            url: url.to_string(),
            reference,
            commit: commit.to_string(),
        })
    }

    /// crates.io, through either the git or the sparse index
    pub fn is_crates_io(&self) -> bool {
        matches!(
            self,
            SourceKind::Registry { index, .. }
                if index == Self::CRATES_IO_INDEX || index == Self::CRATES_IO_SPARSE_INDEX
        )
    }

    pub fn is_git(&self) -> bool {
        matches!(self, SourceKind::Git { .. })
    }

    /// The original `source` string, as cargo writes it
    pub fn source_string(&self) -> String {
        match self {
            SourceKind::Registry { protocol, index } => format!("{}{index}", protocol.prefix()),
            SourceKind::Git { commit, .. } => format!("{}#{commit}", self.replacement_key()),
        }
    }

    /// Key cargo uses for this source in `[source.*]` replacement tables
    pub fn replacement_key(&self) -> String {
        match self {
            SourceKind::Registry { .. } if self.is_crates_io() => "crates-io".to_string(),
            SourceKind::Registry { protocol, index } => format!("{}{index}", protocol.prefix()),
            SourceKind::Git {
                url,
                reference: Some(reference),
                ..
            } => format!("git+{url}?{reference}"),
            SourceKind::Git { url, .. } => format!("git+{url}"),
        }
    }

    /// Index location as cargo's `registry =` replacement key expects it
    ///
    /// Sparse indexes keep their `sparse+` prefix; git indexes are bare URLs.
    pub fn registry_location(&self) -> Option<String> {
        match self {
            SourceKind::Registry {
                protocol: RegistryProtocol::Sparse,
                index,
            } => Some(format!("sparse+{index}")),
            SourceKind::Registry { index, .. } => Some(index.clone()),
            SourceKind::Git { .. } => None,
        }
    }

    /// Default download origin for a package from this source
    ///
    /// crates.io packages resolve to its static CDN; other registries have no
    /// default. Git packages resolve to a commit archive only for
    /// GitHub-hosted repositories.
    pub fn default_origin(&self, id: &DependencyId) -> Option<Origin> {
        match self {
            SourceKind::Registry { .. } if !self.is_crates_io() => None,
            SourceKind::Registry { .. } => Some(Origin::new(format!(
                "https://static.crates.io/crates/{name}/{name}-{version}.crate",
                name = id.name(),
                version = id.version()
            ))),
            SourceKind::Git { url, commit, .. } => {
                let repo = url
                    .strip_prefix("https://github.com/")?
                    .trim_end_matches('/')
                    .trim_end_matches(".git");
                if repo.split('/').count() != 2 {
                    return None;
                }
                Some(Origin::new(format!(
                    "https://github.com/{repo}/archive/{commit}.tar.gz"
                )))
            }
        }
    }
}

/// URL a dependency is fetched from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL scheme (`https`, `http`, `file`), lowercased
    pub fn scheme(&self) -> Option<String> {
        self.0
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
