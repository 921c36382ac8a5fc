//! To-pin command
//!
//! Prints the final pins once every package below the root is published.

use anyhow::{bail, Result};

use super::listing::Listing;
use super::output::Output;
use crate::storage::Workspace;

pub fn run(output: &Output, fmt: Option<&str>) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let (_, state) = workspace.load_state()?;

    let published = state.records().filter(|r| r.todo().published);

    if output.is_json() {
        let pins: Vec<_> = published
            .map(|r| {
                let todo = r.todo();
                serde_json::json!({
                    "name": todo.name,
                    "path": todo.path,
                    "hash": todo.new_hash,
                    "version": todo.new_version,
                })
            })
            .collect();
        output.data(&pins);
    } else {
        let template = fmt.unwrap_or(&workspace.config().formats.to_pin);
        let mut listing = Listing::new(output, template).strict();
        for record in published {
            listing.show(&record)?;
        }
        listing.finish()?;
    }

    let unpublished = state.unpublished_before_final();
    if !unpublished.is_empty() {
        bail!("unpublished dependencies: {}", unpublished.join(" "));
    }
    Ok(())
}
