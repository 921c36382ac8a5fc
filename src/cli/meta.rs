//! Meta command
//!
//! Free-form key/value metadata, per package or shared by every package.
//! Built-in key names cannot be used.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::WorkflowState;
use crate::storage::Workspace;

#[derive(Subcommand)]
pub enum MetaCommands {
    #[command(flatten)]
    Package(MetaAction),

    /// Change the defaults used by every package
    #[command(subcommand)]
    Default(MetaAction),
}

#[derive(Subcommand)]
pub enum MetaAction {
    /// Print the value of a key
    Get { key: String },

    /// Set a key
    Set { key: String, value: String },

    /// Remove a key
    Unset { key: String },

    /// List all key/value pairs
    Vals,
}

pub fn run(output: &Output, package: Option<&str>, command: MetaCommands) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let (store, mut state) = workspace.load_state()?;

    let modified = match command {
        MetaCommands::Default(action) => defaults(output, &mut state, action)?,
        MetaCommands::Package(action) => {
            let name = match package {
                Some(name) => name.to_string(),
                None => workspace.current_manifest()?.name,
            };
            output.verbose_ctx("meta", &format!("Using package {}", name));
            package_meta(output, &mut state, &name, action)?
        }
    };

    if modified {
        store.write(&state.to_document())?;
        output.verbose_ctx("meta", &format!("Wrote {}", store.path().display()));
    }
    Ok(())
}

fn package_meta(
    output: &Output,
    state: &mut WorkflowState,
    name: &str,
    action: MetaAction,
) -> Result<bool> {
    match action {
        MetaAction::Get { key } => {
            let value = state.meta_value(name, &key)?;
            print_value(output, &key, value)?;
            Ok(false)
        }
        MetaAction::Set { key, value } => {
            state.set_meta(name, &key, &value)?;
            output.success(&format!("Set {} for {}", key, name));
            Ok(true)
        }
        MetaAction::Unset { key } => {
            let removed = state.unset_meta(name, &key)?;
            report_unset(output, &key, removed);
            Ok(removed)
        }
        MetaAction::Vals => {
            print_vals(output, state.meta(name)?);
            Ok(false)
        }
    }
}

fn defaults(output: &Output, state: &mut WorkflowState, action: MetaAction) -> Result<bool> {
    match action {
        MetaAction::Get { key } => {
            let value = state.defaults().get(&key).map(String::as_str);
            print_value(output, &key, value)?;
            Ok(false)
        }
        MetaAction::Set { key, value } => {
            state.set_default(&key, &value)?;
            output.success(&format!("Set default {}", key));
            Ok(true)
        }
        MetaAction::Unset { key } => {
            let removed = state.unset_default(&key)?;
            report_unset(output, &key, removed);
            Ok(removed)
        }
        MetaAction::Vals => {
            print_vals(output, state.defaults());
            Ok(false)
        }
    }
}

fn print_value(output: &Output, key: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        bail!("{} not defined", key);
    };
    if output.is_json() {
        output.data(&serde_json::json!({ "key": key, "value": value }));
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn print_vals(output: &Output, vals: &BTreeMap<String, String>) {
    if output.is_json() {
        output.data(vals);
        return;
    }
    for (key, value) in vals {
        println!("{} {}", key, value);
    }
}

fn report_unset(output: &Output, key: &str, removed: bool) {
    if removed {
        output.success(&format!("Unset {}", key));
    } else {
        output.verbose_ctx("meta", &format!("{} was not set", key));
    }
}
