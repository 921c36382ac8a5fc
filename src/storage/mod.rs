//! # Storage Layer
//!
//! File formats and workspace discovery for gx-cascade.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Package manifest | JSON | `<pkg>/package.json` |
//! | Last publication | `<version>: <hash>` | `<pkg>/.gx/lastpubver` |
//! | Session | Pretty JSON | `$GX_UPDATE_STATE` |
//! | Config | TOML | `~/.config/gx-cascade/config.toml` |
//!
//! Dependencies are read from `$GOPATH/src/gx/ipfs/<hash>/<name>/`.
//!
//! ## Key Types
//!
//! - [`Workspace`] - Entry point: GOPATH, current package, session location
//! - [`GxPackageSource`] - Reads manifests and publication markers
//! - [`SessionStore`] - Creates, reads and rewrites the session file
//! - [`Config`] - User configuration

mod config;
mod gx;
mod session;
mod workspace;

pub use config::{Config, ConfigError, FormatConfig, DEFAULT_STATE_FILE};
pub use gx::GxPackageSource;
pub use session::SessionStore;
pub use workspace::{Workspace, WorkspaceError, STATE_ENV};
