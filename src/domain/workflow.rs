//! Update workflow state
//!
//! Turns an update plan into named [`Todo`] records and tracks them across
//! invocations. The state is loaded from a [`SessionDocument`], mutated in
//! place, and written back whole. Derived flags are recomputed on every
//! load and after every mutation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use super::bubble::{DependencyBubbler, PlanEntry, PlanError};
use super::graph::{GraphError, PackageGraph};
use super::hash::Hash;
use super::layout::Layout;
use super::source::{DeclaredDep, LastPublished, PackageSource};
use super::todo::{is_reserved, Record, Todo};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Duplicate entries for {name}: {first} and {second}")]
    DuplicateName {
        name: String,
        first: Hash,
        second: Hash,
    },

    #[error("Could not find entry for {0}")]
    UnknownPackage(String),

    #[error("Duplicate dependency {name}: {first} {second}")]
    DuplicateDependency {
        name: String,
        first: Hash,
        second: Hash,
    },

    #[error("Cannot set internal value: {0}")]
    ReservedKey(String),

    #[error("Could not put {name} in published state: {reason}")]
    NotPublished { name: String, reason: String },

    #[error("Session has no entries")]
    EmptySession,
}

/// Persisted form of a [`WorkflowState`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionDocument {
    #[serde(default)]
    pub todo: Vec<Todo>,

    /// Metadata shared by every entry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, String>,
}

/// Result of gathering an update plan from the root package
#[derive(Debug, Clone)]
pub struct Gathered {
    /// Import path of the root package
    pub root_path: String,
    pub todos: Vec<Todo>,
}

/// Computes the ordered update list for changing `target` in the root package
pub fn gather<S>(source: &S, root_location: &Path, target: &str) -> Result<Gathered, WorkflowError>
where
    S: PackageSource + ?Sized,
{
    let graph = PackageGraph::gather(source, &Hash::root(), root_location)?;
    let target = graph.find_by_name(target)?.hash.clone();
    let plan = DependencyBubbler::new(&graph).plan(&target)?;

    let mut todos = plan
        .into_iter()
        .map(|entry| name_entry(&graph, entry))
        .collect::<Result<Vec<_>, _>>()?;
    todos.sort_by(Todo::order);
    index_by_name(&todos)?;

    let root_path = graph
        .node(&Hash::root())
        .map(|n| n.path.clone())
        .unwrap_or_default();

    Ok(Gathered { root_path, todos })
}

fn name_entry(graph: &PackageGraph, entry: PlanEntry) -> Result<Todo, PlanError> {
    let node = graph.node(&entry.hash).ok_or_else(|| PlanError::Internal {
        package: entry.hash.clone(),
        detail: "planned package missing from the graph".to_string(),
    })?;

    Ok(Todo {
        name: node.name.clone(),
        path: node.path.clone(),
        level: entry.level,
        orig_hash: entry.hash.clone(),
        deps: graph.names(&entry.direct_triggers),
        also_update: graph.names(&entry.also_update),
        indirect: graph.names(&entry.indirect_deps),
        ..Todo::default()
    })
}

fn index_by_name(todos: &[Todo]) -> Result<HashMap<String, usize>, WorkflowError> {
    let mut by_name = HashMap::with_capacity(todos.len());
    for (idx, todo) in todos.iter().enumerate() {
        if let Some(prev) = by_name.insert(todo.name.clone(), idx) {
            return Err(WorkflowError::DuplicateName {
                name: todo.name.clone(),
                first: todos[prev].orig_hash.clone(),
                second: todo.orig_hash.clone(),
            });
        }
    }
    Ok(by_name)
}

/// The tracked update session
#[derive(Debug, Clone)]
pub struct WorkflowState {
    todos: Vec<Todo>,
    defaults: BTreeMap<String, String>,
    by_name: HashMap<String, usize>,
    layout: Layout,
}

impl WorkflowState {
    /// Builds a state, sorting entries and deriving flags
    ///
    /// Fails if two entries share a name.
    pub fn new(
        mut todos: Vec<Todo>,
        defaults: BTreeMap<String, String>,
        layout: Layout,
    ) -> Result<Self, WorkflowError> {
        if todos.is_empty() {
            return Err(WorkflowError::EmptySession);
        }
        todos.sort_by(Todo::order);
        let by_name = index_by_name(&todos)?;

        let mut state = Self {
            todos,
            defaults,
            by_name,
            layout,
        };
        state.update_state();
        Ok(state)
    }

    pub fn from_document(document: SessionDocument, layout: Layout) -> Result<Self, WorkflowError> {
        Self::new(document.todo, document.defaults, layout)
    }

    pub fn to_document(&self) -> SessionDocument {
        SessionDocument {
            todo: self.todos.clone(),
            defaults: self.defaults.clone(),
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    pub fn get(&self, name: &str) -> Option<&Todo> {
        self.by_name.get(name).map(|idx| &self.todos[*idx])
    }

    /// Resolvable view of one entry
    pub fn record(&self, name: &str) -> Result<Record<'_>, WorkflowError> {
        let idx = self.index_of(name)?;
        Ok(self.record_at(idx))
    }

    /// Resolvable views of every entry, in listing order
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        (0..self.todos.len()).map(move |idx| self.record_at(idx))
    }

    fn record_at(&self, idx: usize) -> Record<'_> {
        Record::new(&self.todos[idx], &self.defaults, &self.layout)
    }

    fn index_of(&self, name: &str) -> Result<usize, WorkflowError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| WorkflowError::UnknownPackage(name.to_string()))
    }

    fn is_published(&self, name: &str) -> bool {
        self.get(name).is_some_and(|dep| dep.published)
    }

    /// Recomputes `published`, `ready` and `unmet_deps` for every entry
    ///
    /// Entries are visited in listing order, so dependencies (lower levels)
    /// are settled before their dependents read them. A dependency whose
    /// published hash no longer matches the recorded one revokes the
    /// dependent's publication.
    pub fn update_state(&mut self) {
        for todo in &mut self.todos {
            todo.published = false;
            todo.ready = false;
            todo.unmet_deps.clear();
        }

        for idx in 0..self.todos.len() {
            let todo = &self.todos[idx];
            let published = !todo.new_hash.is_empty()
                && todo.new_deps.iter().all(|(name, hash)| {
                    self.get(name)
                        .is_some_and(|dep| dep.published && dep.new_hash == *hash)
                });

            let unmet: Vec<String> = if published {
                Vec::new()
            } else {
                todo.deps
                    .iter()
                    .filter(|name| !self.is_published(name))
                    .cloned()
                    .collect()
            };

            let todo = &mut self.todos[idx];
            todo.ready = !published && unmet.is_empty();
            todo.published = published;
            todo.unmet_deps = unmet;
        }
    }

    /// Records a publication of `name`
    ///
    /// `declared` are the dependencies currently listed in the package's
    /// manifest; only those tracked by this session are kept. The state is
    /// updated even when the result is not a valid publication, in which
    /// case the mismatch is returned as an error.
    pub fn mark(
        &mut self,
        name: &str,
        last_published: &LastPublished,
        declared: &[DeclaredDep],
    ) -> Result<(), WorkflowError> {
        let idx = self.index_of(name)?;

        let mut new_deps: BTreeMap<String, Hash> = BTreeMap::new();
        for dep in declared {
            if let Some(prev) = new_deps.get(&dep.name) {
                return Err(WorkflowError::DuplicateDependency {
                    name: dep.name.clone(),
                    first: prev.clone(),
                    second: dep.hash.clone(),
                });
            }
            new_deps.insert(dep.name.clone(), dep.hash.clone());
        }
        new_deps.retain(|dep_name, _| self.by_name.contains_key(dep_name));

        let todo = &mut self.todos[idx];
        todo.new_hash = last_published.hash.clone();
        todo.new_version = last_published.version.clone();
        todo.new_deps = new_deps;
        self.update_state();

        if self.todos[idx].published {
            Ok(())
        } else {
            Err(WorkflowError::NotPublished {
                name: name.to_string(),
                reason: self.describe_mismatch(idx),
            })
        }
    }

    fn describe_mismatch(&self, idx: usize) -> String {
        let todo = &self.todos[idx];
        if todo.new_hash.is_empty() {
            return "no published hash".to_string();
        }

        let problems: Vec<String> = todo
            .new_deps
            .iter()
            .filter_map(|(name, hash)| match self.get(name) {
                None => Some(format!("{} is not tracked", name)),
                Some(dep) if !dep.published => Some(format!("{} is not published", name)),
                Some(dep) if dep.new_hash != *hash => Some(format!(
                    "{} is recorded at {} but published {}",
                    name, hash, dep.new_hash
                )),
                Some(_) => None,
            })
            .collect();
        problems.join("; ")
    }

    /// Forgets the publication of `name`
    pub fn reset(&mut self, name: &str) -> Result<(), WorkflowError> {
        let idx = self.index_of(name)?;
        self.todos[idx].clear_publication();
        self.update_state();
        Ok(())
    }

    /// Forgets every publication that is no longer valid
    ///
    /// Returns the number of entries cleared.
    pub fn clean(&mut self) -> usize {
        let mut cleared = 0;
        for todo in self.todos.iter_mut().filter(|t| !t.published) {
            if !todo.new_hash.is_empty() || !todo.new_deps.is_empty() {
                cleared += 1;
            }
            todo.clear_publication();
        }
        self.update_state();
        cleared
    }

    /// Names of unpublished entries, ignoring the final one
    ///
    /// The last entry is the root package, which does not need to be
    /// published itself.
    pub fn unpublished_before_final(&self) -> Vec<&str> {
        let last = self.todos.len().saturating_sub(1);
        self.todos[..last]
            .iter()
            .filter(|t| !t.published)
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn meta(&self, name: &str) -> Result<&BTreeMap<String, String>, WorkflowError> {
        let idx = self.index_of(name)?;
        Ok(&self.todos[idx].meta)
    }

    /// Metadata value for `name`, falling back to the shared defaults
    pub fn meta_value(&self, name: &str, key: &str) -> Result<Option<&str>, WorkflowError> {
        let idx = self.index_of(name)?;
        Ok(self.todos[idx]
            .meta
            .get(key)
            .or_else(|| self.defaults.get(key))
            .map(String::as_str))
    }

    pub fn set_meta(&mut self, name: &str, key: &str, value: &str) -> Result<(), WorkflowError> {
        check_key(key)?;
        let idx = self.index_of(name)?;
        self.todos[idx]
            .meta
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Returns true if the key was present
    pub fn unset_meta(&mut self, name: &str, key: &str) -> Result<bool, WorkflowError> {
        check_key(key)?;
        let idx = self.index_of(name)?;
        Ok(self.todos[idx].meta.remove(key).is_some())
    }

    pub fn set_default(&mut self, key: &str, value: &str) -> Result<(), WorkflowError> {
        check_key(key)?;
        self.defaults.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn unset_default(&mut self, key: &str) -> Result<bool, WorkflowError> {
        check_key(key)?;
        Ok(self.defaults.remove(key).is_some())
    }
}

fn check_key(key: &str) -> Result<(), WorkflowError> {
    if is_reserved(key) {
        return Err(WorkflowError::ReservedKey(key.to_string()));
    }
    Ok(())
}
