//! Reverse-dependency level decomposition
//!
//! Given a target package, works out every package that has to be
//! republished after the target changes, and in which order. Packages are
//! grouped into levels: level 0 is the target itself, and a package lands on
//! level N once everything it depends on inside the update scope has landed
//! on a lower level.

use std::collections::BTreeMap;
use thiserror::Error;

use super::graph::{PackageGraph, PackageNode};
use super::hash::{DependencySet, Hash};

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("Target package {0} is not in the dependency graph")]
    TargetNotFound(Hash),

    /// The algorithm reached a state that a consistent graph cannot produce
    #[error("Internal inconsistency while planning {package}: {detail}")]
    Internal { package: Hash, detail: String },
}

/// One package in the update plan, before names are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub hash: Hash,
    pub level: usize,
    /// Packages resolved on the previous level that caused this one to resolve
    pub direct_triggers: Vec<Hash>,
    /// In-scope packages declared in the manifest that were not triggers
    pub also_update: Vec<Hash>,
    /// In-scope transitive dependencies other than the triggers
    pub indirect_deps: Vec<Hash>,
}

/// Computes level-ordered update plans over a [`PackageGraph`]
pub struct DependencyBubbler<'g> {
    graph: &'g PackageGraph,
}

impl<'g> DependencyBubbler<'g> {
    pub fn new(graph: &'g PackageGraph) -> Self {
        Self { graph }
    }

    /// Returns one entry for the target and for each package depending on it
    pub fn plan(&self, target: &Hash) -> Result<Vec<PlanEntry>, PlanError> {
        if !self.graph.contains(target) {
            return Err(PlanError::TargetNotFound(target.clone()));
        }

        let mut scope = self.graph.reverse_deps(target);
        scope.add(target.clone());

        // Pending in-scope deps per package, shrinking every round
        let mut restricted: BTreeMap<Hash, DependencySet> = BTreeMap::new();
        let mut full: BTreeMap<Hash, DependencySet> = BTreeMap::new();
        for hash in &scope {
            let deps = self.node(hash)?.deps.intersect(&scope);
            full.insert(hash.clone(), deps.clone());
            restricted.insert(hash.clone(), deps);
        }

        let mut plan = Vec::with_capacity(scope.len());
        let mut triggers = Vec::new();
        let mut level = 0;

        loop {
            let resolved =
                self.resolve_round(level, target, &triggers, &mut restricted, &full, &mut plan)?;
            if resolved.is_empty() {
                break;
            }
            triggers = resolved;
            level += 1;
        }

        if let Some(stuck) = restricted.keys().next() {
            return Err(PlanError::Internal {
                package: stuck.clone(),
                detail: format!(
                    "{} package(s) never resolved after {} level(s)",
                    restricted.len(),
                    level
                ),
            });
        }

        Ok(plan)
    }

    fn resolve_round(
        &self,
        level: usize,
        target: &Hash,
        triggers: &[Hash],
        restricted: &mut BTreeMap<Hash, DependencySet>,
        full: &BTreeMap<Hash, DependencySet>,
        plan: &mut Vec<PlanEntry>,
    ) -> Result<Vec<Hash>, PlanError> {
        let mut resolved = Vec::new();

        for (hash, pending) in restricted.iter_mut() {
            let pruned: Vec<Hash> = triggers
                .iter()
                .filter(|t| pending.contains(t))
                .cloned()
                .collect();
            pending.remove_all(&pruned);

            if !pending.is_empty() {
                continue;
            }

            let is_target_round = level == 0 && hash == target;
            if pruned.is_empty() && !is_target_round {
                return Err(PlanError::Internal {
                    package: hash.clone(),
                    detail: format!("resolved on level {} without a trigger", level),
                });
            }

            let full_deps = &full[hash];
            let mut also_update = self.node(hash)?.direct_deps.intersect(full_deps);
            let declared = also_update.remove_all(&pruned);
            if declared != pruned.len() {
                return Err(PlanError::Internal {
                    package: hash.clone(),
                    detail: format!(
                        "{} of {} triggers are missing from the declared dependencies",
                        pruned.len() - declared,
                        pruned.len()
                    ),
                });
            }

            let mut indirect = full_deps.clone();
            indirect.remove_all(&pruned);

            plan.push(PlanEntry {
                hash: hash.clone(),
                level,
                direct_triggers: pruned,
                also_update: also_update.to_vec(),
                indirect_deps: indirect.to_vec(),
            });
            resolved.push(hash.clone());
        }

        for hash in &resolved {
            restricted.remove(hash);
        }

        Ok(resolved)
    }

    fn node(&self, hash: &Hash) -> Result<&'g PackageNode, PlanError> {
        self.graph.node(hash).ok_or_else(|| PlanError::Internal {
            package: hash.clone(),
            detail: "in scope but missing from the graph".to_string(),
        })
    }
}
