//! gx package store on disk
//!
//! Manifests live in `package.json`; the version and hash of the last
//! publication live in `.gx/lastpubver`. Dependencies are unpacked under
//! `$GOPATH/src/gx/ipfs/<hash>/<name>`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{
    DeclaredDep, Hash, LastPublished, Layout, Manifest, ManifestError, PackageSource,
};

const MANIFEST_FILE: &str = "package.json";
const LAST_PUBLISHED_FILE: &str = ".gx/lastpubver";

#[derive(Debug, Deserialize)]
struct PackageFile {
    #[serde(default)]
    name: String,

    #[serde(default, rename = "gxDependencies")]
    gx_dependencies: Vec<PackageDep>,

    #[serde(default)]
    gx: PackageGx,
}

#[derive(Debug, Deserialize)]
struct PackageDep {
    hash: Hash,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PackageGx {
    #[serde(default)]
    dvcsimport: String,
}

/// [`PackageSource`] reading a GOPATH-based gx workspace
#[derive(Debug, Clone)]
pub struct GxPackageSource {
    layout: Layout,
}

impl GxPackageSource {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    fn read(path: PathBuf) -> Result<(PathBuf, String), ManifestError> {
        match fs::read_to_string(&path) {
            Ok(content) => Ok((path, content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ManifestError::Missing(path)),
            Err(source) => Err(ManifestError::Io { path, source }),
        }
    }
}

impl PackageSource for GxPackageSource {
    fn read_manifest(&self, location: &Path) -> Result<Manifest, ManifestError> {
        let (path, content) = Self::read(location.join(MANIFEST_FILE))?;
        let file: PackageFile =
            serde_json::from_str(&content).map_err(|e| ManifestError::Malformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if file.name.is_empty() {
            return Err(ManifestError::Malformed {
                path,
                reason: "missing package name".to_string(),
            });
        }

        Ok(Manifest {
            name: file.name,
            path: file.gx.dvcsimport,
            deps: file
                .gx_dependencies
                .into_iter()
                .map(|dep| DeclaredDep {
                    hash: dep.hash,
                    name: dep.name,
                })
                .collect(),
        })
    }

    fn read_last_published(&self, location: &Path) -> Result<LastPublished, ManifestError> {
        let (path, content) = Self::read(location.join(LAST_PUBLISHED_FILE))?;
        LastPublished::parse(&content).ok_or_else(|| ManifestError::BadMarker {
            path,
            content: content.trim().to_string(),
        })
    }

    fn dependency_location(&self, hash: &Hash, name: &str) -> PathBuf {
        self.layout.package_dir(hash, name)
    }
}
