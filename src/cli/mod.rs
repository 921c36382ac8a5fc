//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Workflow
//!
//! | Step | Command |
//! |------|---------|
//! | See what an update involves | `preview <dep>` |
//! | Start a session | `init <dep>`, then export `GX_UPDATE_STATE` |
//! | Find packages to work on | `status`, `list ready` |
//! | Record a publication | `published` (in the package directory) |
//! | Recover from stale publications | `published clean` |
//! | Pin the results | `to-pin` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Rendered through `-f/--fmt` templates
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! gx-cascade --verbose status
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod deps;
mod listing;
mod meta;
mod output;
mod preview;
mod published;
mod session;
mod to_pin;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
