//! Session commands (init, status, state, list)

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use super::listing::{Listing, StatusView};
use super::output::Output;
use crate::domain::{gather, WorkflowState};
use crate::storage::{Workspace, STATE_ENV};

/// Creates a new session in the root directory of the current package
pub fn init(output: &Output, dep: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;

    let gathered = gather(&workspace.source(), workspace.current_dir(), dep)?;
    let state = WorkflowState::new(gathered.todos, BTreeMap::new(), workspace.layout().clone())?;
    output.verbose_ctx("init", &format!("{} package(s) to update", state.todos().len()));

    let root_dir = workspace.check_root_dir(&gathered.root_path)?;
    let store = workspace.new_session_store(&root_dir);
    store.create(&state.to_document())?;
    output.verbose_ctx("init", &format!("Created {}", store.path().display()));

    if output.is_json() {
        output.data(&serde_json::json!({
            "state_file": store.path(),
            "entries": state.todos().len(),
        }));
    } else {
        println!("export {}={}", STATE_ENV, store.path().display());
    }

    Ok(())
}

/// `list --by-level` with the status template
pub fn status(output: &Output) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let template = workspace.config().formats.status.clone();
    show(output, &workspace, &template, true, None)
}

/// Prints the session document as stored
pub fn state(output: &Output) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let store = workspace.session_store()?;
    output.verbose_ctx("state", &format!("Reading {}", store.path().display()));

    print!("{}", store.raw()?);
    Ok(())
}

pub fn list(
    output: &Output,
    fmt: Option<&str>,
    by_level: bool,
    condition: &[String],
) -> Result<()> {
    let condition = Condition::parse(condition)?;
    let workspace = Workspace::open_current()?;
    let template = fmt
        .map(str::to_string)
        .unwrap_or_else(|| workspace.config().formats.list.clone());

    show(output, &workspace, &template, by_level, condition.as_ref())
}

/// Filter on whether a key currently has a value
#[derive(Debug, Clone, PartialEq, Eq)]
struct Condition {
    key: String,
    invert: bool,
}

impl Condition {
    fn parse(words: &[String]) -> Result<Option<Self>> {
        match words {
            [] => Ok(None),
            [not, key] if not == "not" => Ok(Some(Self {
                key: key.clone(),
                invert: true,
            })),
            [key] if key != "not" => Ok(Some(Self {
                key: key.clone(),
                invert: false,
            })),
            _ => bail!("usage: gx-cascade list [-f <fmt>] [--by-level] [not] [<cond>]"),
        }
    }
}

fn show(
    output: &Output,
    workspace: &Workspace,
    template: &str,
    by_level: bool,
    condition: Option<&Condition>,
) -> Result<()> {
    let (store, state) = workspace.load_state()?;
    output.verbose_ctx(
        "list",
        &format!(
            "Loaded {} entries from {}",
            state.todos().len(),
            store.path().display()
        ),
    );

    let selected = state
        .records()
        .filter(|record| match condition {
            Some(cond) => record.matches(&cond.key) != cond.invert,
            None => true,
        });

    if output.is_json() {
        let views: Vec<StatusView> = selected.map(|r| StatusView::from(r.todo())).collect();
        output.data(&views);
        return Ok(());
    }

    let mut listing = Listing::new(output, template).by_level(by_level);
    for record in selected {
        listing.show(&record)?;
    }
    output.verbose_ctx("list", &format!("Displayed {} entries", listing.shown()));
    listing.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn parse_conditions() {
        assert_eq!(Condition::parse(&[]).unwrap(), None);
        assert_eq!(
            Condition::parse(&words(&["ready"])).unwrap(),
            Some(Condition {
                key: "ready".to_string(),
                invert: false
            })
        );
        assert_eq!(
            Condition::parse(&words(&["not", "published"])).unwrap(),
            Some(Condition {
                key: "published".to_string(),
                invert: true
            })
        );
    }

    #[test]
    fn reject_malformed_conditions() {
        assert!(Condition::parse(&words(&["not"])).is_err());
        assert!(Condition::parse(&words(&["ready", "published"])).is_err());
    }
}
