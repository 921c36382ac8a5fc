//! Main CLI application structure

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use super::deps::DepKind;
use super::meta::MetaCommands;
use super::output::{Output, OutputFormat};
use super::published::PublishedAction;
use super::{deps, meta, preview, published, session, to_pin};
use crate::domain::{format_help, ALL_KEYS, BASIC_KEYS};

#[derive(Parser)]
#[command(name = "gx-cascade")]
#[command(author, version, about = "Coordinate cascading republishing of gx packages")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show packages that need to change to change <dep> in the current package
    #[command(after_long_help = format_help(BASIC_KEYS))]
    Preview {
        /// Only list the packages, without level breaks
        #[arg(long)]
        list: bool,

        /// Template for each line
        #[arg(short = 'f', long = "fmt")]
        fmt: Option<String>,

        /// Name of the dependency to update
        dep: String,
    },

    /// Start a session for updating <dep> in the current package
    ///
    /// Creates the session file in the package's root directory and prints
    /// the command that exports GX_UPDATE_STATE for Bourne shells.
    Init {
        /// Name of the dependency to update
        dep: String,
    },

    /// Show the current status of every package
    #[command(after_long_help = format_help(ALL_KEYS))]
    Status,

    /// Print the raw session document
    State,

    /// List packages, optionally matching a condition
    #[command(after_long_help = format_help(ALL_KEYS))]
    List(ListArgs),

    /// List recorded dependencies of a package
    #[command(after_long_help = format_help(ALL_KEYS))]
    Deps(DepsArgs),

    /// Change the published state of the current package
    Published {
        /// mark: record .gx/lastpubver; reset: forget it; clean: forget every
        /// invalidated publication
        #[arg(value_enum, default_value = "mark")]
        action: PublishedAction,
    },

    /// List the pins of published packages once done
    #[command(after_long_help = format_help(ALL_KEYS))]
    ToPin {
        /// Template for each line
        #[arg(short = 'f', long = "fmt")]
        fmt: Option<String>,
    },

    /// Get or change metadata for a package or the session defaults
    Meta {
        /// Package to use instead of the current one
        #[arg(short = 'p', long = "package", global = true)]
        package: Option<String>,

        #[command(subcommand)]
        command: MetaCommands,
    },
}

#[derive(Args)]
pub struct ListArgs {
    /// Template for each line
    #[arg(short = 'f', long = "fmt")]
    pub fmt: Option<String>,

    /// Separate levels of the reverse dependency graph with a blank line
    #[arg(long)]
    pub by_level: bool,

    /// `[not] <key>`: only list packages where <key> is (not) defined
    #[arg(num_args = 0..=2, value_name = "CONDITION")]
    pub condition: Vec<String>,
}

#[derive(Args)]
pub struct DepsArgs {
    /// Template for each line
    #[arg(short = 'f', long = "fmt")]
    pub fmt: Option<String>,

    /// Package to use instead of the current one
    #[arg(short = 'p', long = "package")]
    pub package: Option<String>,

    /// Which dependencies to list (default: direct)
    #[arg(value_enum)]
    pub which: Vec<DepKind>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    output.verbose("gx-cascade starting");

    match cli.command {
        Commands::Preview { list, fmt, dep } => {
            output.verbose_ctx("preview", &format!("Planning update of {}", dep));
            preview::run(&output, &dep, list, fmt.as_deref())?
        }
        Commands::Init { dep } => {
            output.verbose_ctx("init", &format!("Starting session for {}", dep));
            session::init(&output, &dep)?
        }
        Commands::Status => session::status(&output)?,
        Commands::State => session::state(&output)?,
        Commands::List(args) => {
            session::list(&output, args.fmt.as_deref(), args.by_level, &args.condition)?
        }
        Commands::Deps(args) => deps::run(
            &output,
            args.package.as_deref(),
            args.fmt.as_deref(),
            &args.which,
        )?,
        Commands::Published { action } => published::run(&output, action)?,
        Commands::ToPin { fmt } => to_pin::run(&output, fmt.as_deref())?,
        Commands::Meta { package, command } => meta::run(&output, package.as_deref(), command)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}
