//! Deps command
//!
//! Lists the recorded dependency names of one package, rendered through
//! each dependency's own record.

use std::collections::BTreeSet;

use anyhow::Result;

use super::listing::{Listing, StatusView};
use super::output::Output;
use crate::domain::{Todo, WorkflowError};
use crate::storage::Workspace;

/// Dependency categories of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DepKind {
    /// What the package must be updated to pick up
    Direct,
    /// Other updated packages listed in package.json
    Also,
    /// direct + also
    ToUpdate,
    /// Same as to-update
    Specified,
    /// Every updated package in the transitive closure
    Indirect,
    /// direct + also + indirect
    All,
}

pub fn run(
    output: &Output,
    package: Option<&str>,
    fmt: Option<&str>,
    kinds: &[DepKind],
) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let (_, state) = workspace.load_state()?;

    let name = match package {
        Some(name) => name.to_string(),
        None => workspace.current_manifest()?.name,
    };
    let todo = state
        .get(&name)
        .ok_or_else(|| WorkflowError::UnknownPackage(name.clone()))?;

    let names = select(todo, kinds);
    output.verbose_ctx(
        "deps",
        &format!("{} dependencies selected for {}", names.len(), name),
    );

    if output.is_json() {
        let views = names
            .iter()
            .map(|dep| state.record(dep).map(|r| StatusView::from(r.todo())))
            .collect::<Result<Vec<_>, _>>()?;
        output.data(&views);
        return Ok(());
    }

    let template = fmt.unwrap_or(&workspace.config().formats.deps);
    let mut listing = Listing::new(output, template);
    for dep in &names {
        listing.show(&state.record(dep)?)?;
    }
    listing.finish()
}

/// Sorted, de-duplicated names of the requested categories
fn select(todo: &Todo, kinds: &[DepKind]) -> Vec<String> {
    let (mut direct, mut also, mut indirect) = (kinds.is_empty(), false, false);
    for kind in kinds {
        match kind {
            DepKind::Direct => direct = true,
            DepKind::Also => also = true,
            DepKind::ToUpdate | DepKind::Specified => {
                direct = true;
                also = true;
            }
            DepKind::Indirect => indirect = true,
            DepKind::All => {
                direct = true;
                also = true;
                indirect = true;
            }
        }
    }

    let mut names = BTreeSet::new();
    if direct {
        names.extend(todo.deps.iter().cloned());
    }
    if also {
        names.extend(todo.also_update.iter().cloned());
    }
    if indirect {
        names.extend(todo.indirect.iter().cloned());
    }
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo() -> Todo {
        Todo {
            name: "app".to_string(),
            deps: vec!["c".to_string()],
            also_update: vec!["b".to_string()],
            indirect: vec!["a".to_string(), "b".to_string()],
            ..Todo::default()
        }
    }

    #[test]
    fn direct_by_default() {
        assert_eq!(select(&todo(), &[]), vec!["c"]);
    }

    #[test]
    fn to_update_is_direct_and_also() {
        assert_eq!(select(&todo(), &[DepKind::ToUpdate]), vec!["b", "c"]);
        assert_eq!(select(&todo(), &[DepKind::Specified]), vec!["b", "c"]);
    }

    #[test]
    fn all_is_deduplicated() {
        assert_eq!(select(&todo(), &[DepKind::All]), vec!["a", "b", "c"]);
        assert_eq!(
            select(&todo(), &[DepKind::Also, DepKind::Indirect]),
            vec!["a", "b"]
        );
    }
}
