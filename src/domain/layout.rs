//! Workspace layout
//!
//! Everything that depends on where packages live on disk is derived from a
//! single GOPATH value. The layout is built once at startup and handed to
//! the package source and the workflow state.

use std::path::{Path, PathBuf};

use super::hash::Hash;

/// Immutable description of the package tree on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    gopath: PathBuf,
}

impl Layout {
    pub fn new(gopath: impl Into<PathBuf>) -> Self {
        Self {
            gopath: gopath.into(),
        }
    }

    pub fn gopath(&self) -> &Path {
        &self.gopath
    }

    /// Root of all published gx packages (`$GOPATH/src/gx/ipfs`)
    pub fn gx_root(&self) -> PathBuf {
        self.gopath.join("src").join("gx").join("ipfs")
    }

    /// Directory of a published dependency
    pub fn package_dir(&self, hash: &Hash, name: &str) -> PathBuf {
        self.gx_root().join(hash.as_str()).join(name)
    }

    /// Source checkout directory for an import path (`$GOPATH/src/<path>`)
    pub fn source_dir(&self, import_path: &str) -> PathBuf {
        import_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.gopath.join("src"), |dir, segment| dir.join(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_dir_nests_hash_then_name() {
        let layout = Layout::new("/go");
        assert_eq!(
            layout.package_dir(&Hash::from("QmAbc"), "go-log"),
            PathBuf::from("/go/src/gx/ipfs/QmAbc/go-log")
        );
    }

    #[test]
    fn source_dir_follows_import_path() {
        let layout = Layout::new("/go");
        assert_eq!(
            layout.source_dir("github.com/ipfs/go-log"),
            PathBuf::from("/go/src/github.com/ipfs/go-log")
        );
    }
}
