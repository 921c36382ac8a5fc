//! Session file storage
//!
//! The session document is a single pretty-printed JSON file. It is created
//! exactly once and afterwards only rewritten in place: every write replaces
//! the whole document through a temp file and rename.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::domain::SessionDocument;

/// Store for the update session document
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Creates the session file, failing if it already exists
    pub fn create(&self, document: &SessionDocument) -> Result<()> {
        let content = encode(document)?;

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                bail!("Session file already exists: {}", self.path.display())
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to create session file: {}", self.path.display())
                })
            }
        };

        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))
    }

    /// Reads and parses the session document
    pub fn read(&self) -> Result<SessionDocument> {
        let content = self.raw()?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))
    }

    /// Reads the session file without parsing it
    pub fn raw(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))
    }

    /// Rewrites the whole session document
    ///
    /// The file must already exist; a session is only ever started by
    /// [`SessionStore::create`].
    pub fn write(&self, document: &SessionDocument) -> Result<()> {
        if !self.exists() {
            bail!(
                "Session file does not exist: {}. Run 'gx-cascade init' first.",
                self.path.display()
            );
        }

        let content = encode(document)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }
}

fn encode(document: &SessionDocument) -> Result<String> {
    let mut content =
        serde_json::to_string_pretty(document).context("Failed to serialize session")?;
    content.push('\n');
    Ok(content)
}
