//! Configuration handling for gx-cascade
//!
//! Configuration is read from `~/.config/gx-cascade/config.toml` (or the
//! platform equivalent). Every setting is optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session file name used by `init` when none is configured
pub const DEFAULT_STATE_FILE: &str = ".gx-update-state.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Default templates for the listing commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormatConfig {
    pub preview: String,
    pub list: String,
    pub status: String,
    pub deps: String,
    pub to_pin: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            preview: "$path[ :: $deps]".to_string(),
            list: "$path".to_string(),
            status: "$path[ ($invalidated)][ = $hash][ $ready][ :: $unmet]".to_string(),
            deps: "$path".to_string(),
            to_pin: "$hash $path $version".to_string(),
        }
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Used when `GOPATH` is not set
    pub gopath: Option<PathBuf>,

    /// Session file name created by `init`
    pub state_file: String,

    pub formats: FormatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gopath: None,
            state_file: DEFAULT_STATE_FILE.to_string(),
            formats: FormatConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the default location
    pub fn load() -> Result<Self> {
        match Self::config_dir() {
            Some(dir) => Self::load_from(&dir.join("config.toml")),
            None => Ok(Self::default()),
        }
    }

    /// Returns the config directory
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("io", "gx", "gx-cascade").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads configuration from a file, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }
}
