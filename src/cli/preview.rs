//! Preview command
//!
//! Computes the update plan for the current package without touching any
//! session.

use std::collections::BTreeMap;

use anyhow::Result;

use super::listing::Listing;
use super::output::Output;
use crate::domain::{gather, Record};
use crate::storage::Workspace;

/// Shows the packages to update, in order, one line each
pub fn run(output: &Output, dep: &str, list: bool, fmt: Option<&str>) -> Result<()> {
    let workspace = Workspace::open_current()?;
    output.verbose_ctx(
        "preview",
        &format!("GOPATH: {}", workspace.layout().gopath().display()),
    );

    let gathered = gather(&workspace.source(), workspace.current_dir(), dep)?;
    output.verbose_ctx(
        "preview",
        &format!(
            "{} package(s) to update in {}",
            gathered.todos.len(),
            gathered.root_path
        ),
    );

    if output.is_json() {
        output.data(&gathered.todos);
        return Ok(());
    }

    let formats = &workspace.config().formats;
    let template = match (fmt, list) {
        (Some(fmt), _) => fmt,
        (None, true) => formats.list.as_str(),
        (None, false) => formats.preview.as_str(),
    };

    let defaults = BTreeMap::new();
    let mut listing = Listing::new(output, template).by_level(!list).strict();
    for todo in &gathered.todos {
        listing.show(&Record::new(todo, &defaults, workspace.layout()))?;
    }
    listing.finish()
}
