//! Package source port
//!
//! The graph and the workflow never touch the file system directly. They
//! read manifests and last-published markers through [`PackageSource`], so
//! they can be exercised against [`MemorySource`] in tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::Hash;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("No package manifest found at {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed package manifest {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Bad last-published marker {}: {content:?}", .path.display())]
    BadMarker { path: PathBuf, content: String },
}

/// A dependency as declared in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDep {
    pub hash: Hash,
    pub name: String,
}

/// The parts of a package manifest the planner needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    /// Import path, e.g. `github.com/ipfs/go-log`
    pub path: String,
    pub deps: Vec<DeclaredDep>,
}

impl Manifest {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            deps: Vec::new(),
        }
    }

    /// Builder-style helper to declare a direct dependency
    pub fn depends_on(mut self, hash: impl Into<Hash>, name: impl Into<String>) -> Self {
        self.deps.push(DeclaredDep {
            hash: hash.into(),
            name: name.into(),
        });
        self
    }
}

/// Version and hash of the most recent publication of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastPublished {
    pub version: String,
    pub hash: Hash,
}

impl LastPublished {
    /// Parses the `<version>: <hash>` marker format
    pub fn parse(content: &str) -> Option<Self> {
        let (version, hash) = content.trim().split_once(": ")?;
        let version = version.trim();
        let hash = hash.trim();
        if version.is_empty() || hash.is_empty() {
            return None;
        }
        Some(Self {
            version: version.to_string(),
            hash: Hash::from(hash),
        })
    }
}

/// Read access to package manifests and publication markers
pub trait PackageSource {
    /// Reads the manifest of the package at `location`
    fn read_manifest(&self, location: &Path) -> Result<Manifest, ManifestError>;

    /// Reads the last-published marker of the package at `location`
    fn read_last_published(&self, location: &Path) -> Result<LastPublished, ManifestError>;

    /// Where a declared dependency can be found
    fn dependency_location(&self, hash: &Hash, name: &str) -> PathBuf;
}

/// In-memory [`PackageSource`]
///
/// Published packages are stored under `<hash>/<name>`; the root package
/// lives at [`MemorySource::ROOT`].
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    manifests: HashMap<PathBuf, Manifest>,
    published: HashMap<PathBuf, LastPublished>,
}

impl MemorySource {
    pub const ROOT: &'static str = ".";

    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the root package
    pub fn add_root(&mut self, manifest: Manifest) {
        self.manifests.insert(PathBuf::from(Self::ROOT), manifest);
    }

    /// Registers a published package under its hash
    pub fn add_package(&mut self, hash: impl Into<Hash>, manifest: Manifest) {
        let location = self.dependency_location(&hash.into(), &manifest.name);
        self.manifests.insert(location, manifest);
    }

    /// Records a last-published marker for the package at `location`
    pub fn set_last_published(
        &mut self,
        location: impl Into<PathBuf>,
        published: LastPublished,
    ) {
        self.published.insert(location.into(), published);
    }
}

impl PackageSource for MemorySource {
    fn read_manifest(&self, location: &Path) -> Result<Manifest, ManifestError> {
        self.manifests
            .get(location)
            .cloned()
            .ok_or_else(|| ManifestError::Missing(location.to_path_buf()))
    }

    fn read_last_published(&self, location: &Path) -> Result<LastPublished, ManifestError> {
        self.published
            .get(location)
            .cloned()
            .ok_or_else(|| ManifestError::Missing(location.to_path_buf()))
    }

    fn dependency_location(&self, hash: &Hash, name: &str) -> PathBuf {
        PathBuf::from(hash.as_str()).join(name)
    }
}
