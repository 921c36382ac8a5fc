//! Workspace discovery
//!
//! Resolves the GOPATH, the current package and the session file, and hands
//! out the stores and sources that operate on them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, GxPackageSource, SessionStore};
use crate::domain::{LastPublished, Layout, Manifest, PackageSource, WorkflowState};

/// Environment variable holding the session file path
pub const STATE_ENV: &str = "GX_UPDATE_STATE";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("GOPATH not set")]
    GopathNotSet,

    #[error("GX_UPDATE_STATE not set. Run 'gx-cascade init' and export the printed variable.")]
    StateNotSet,

    #[error(
        "Current directory {} is not the project's root directory {}",
        .current.display(),
        .expected.display()
    )]
    NotRootDir { current: PathBuf, expected: PathBuf },
}

/// The GOPATH and package the tool is operating on
#[derive(Debug, Clone)]
pub struct Workspace {
    layout: Layout,
    config: Config,
    current_dir: PathBuf,
    state_path: Option<PathBuf>,
}

impl Workspace {
    pub fn new(
        layout: Layout,
        config: Config,
        current_dir: impl Into<PathBuf>,
        state_path: Option<PathBuf>,
    ) -> Self {
        Self {
            layout,
            config,
            current_dir: current_dir.into(),
            state_path,
        }
    }

    /// Opens the workspace from the environment and user configuration
    pub fn open_current() -> Result<Self> {
        let config = Config::load()?;

        let gopath = non_empty_env("GOPATH")
            .or_else(|| config.gopath.clone())
            .ok_or(WorkspaceError::GopathNotSet)?;
        let current_dir = env::current_dir().context("Failed to determine current directory")?;
        let state_path = non_empty_env(STATE_ENV);

        Ok(Self::new(Layout::new(gopath), config, current_dir, state_path))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn source(&self) -> GxPackageSource {
        GxPackageSource::new(self.layout.clone())
    }

    /// Manifest of the package in the current directory
    pub fn current_manifest(&self) -> Result<Manifest> {
        self.source()
            .read_manifest(&self.current_dir)
            .context("Failed to read the current package")
    }

    /// Last-published marker of the package in the current directory
    pub fn current_last_published(&self) -> Result<LastPublished> {
        self.source()
            .read_last_published(&self.current_dir)
            .context("Failed to read the current package's last published version")
    }

    /// Store for the active session, located through `GX_UPDATE_STATE`
    pub fn session_store(&self) -> Result<SessionStore> {
        let path = self.state_path.as_ref().ok_or(WorkspaceError::StateNotSet)?;
        Ok(SessionStore::new(path))
    }

    /// Checks that the current directory is the source directory of
    /// `import_path` and returns that directory
    pub fn check_root_dir(&self, import_path: &str) -> Result<PathBuf> {
        let expected = self.layout.source_dir(import_path);
        let root = fs::canonicalize(&expected)
            .with_context(|| format!("Failed to resolve {}", expected.display()))?;
        let current = fs::canonicalize(&self.current_dir)
            .with_context(|| format!("Failed to resolve {}", self.current_dir.display()))?;

        if root != current {
            return Err(WorkspaceError::NotRootDir {
                current: self.current_dir.clone(),
                expected,
            }
            .into());
        }
        Ok(expected)
    }

    /// Store for a new session created in the root directory
    pub fn new_session_store(&self, root_dir: &Path) -> SessionStore {
        SessionStore::new(root_dir.join(&self.config.state_file))
    }

    /// Loads the active session
    pub fn load_state(&self) -> Result<(SessionStore, WorkflowState)> {
        let store = self.session_store()?;
        let document = store.read()?;
        let state = WorkflowState::from_document(document, self.layout.clone())
            .with_context(|| format!("Invalid session file: {}", store.path().display()))?;
        Ok((store, state))
    }
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
