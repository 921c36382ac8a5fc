//! Package dependency graph
//!
//! Every package reachable from the root is read exactly once and stored in
//! a petgraph arena keyed by hash. Nodes only refer to each other by hash,
//! so closures and working sets never alias node data.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::hash::{DependencySet, Hash};
use super::source::{ManifestError, PackageSource};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Could not gather deps at {}: {source}", .location.display())]
    Manifest {
        location: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("Dependency cycle detected at package {0}")]
    CycleDetected(Hash),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Package name {name} matches several versions: {}", join_hashes(.hashes))]
    AmbiguousName { name: String, hashes: Vec<Hash> },
}

fn join_hashes(hashes: &[Hash]) -> String {
    hashes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One package version in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    pub hash: Hash,
    pub name: String,
    /// Import path
    pub path: String,
    /// Dependencies declared in the manifest
    pub direct_deps: DependencySet,
    /// Full transitive closure of dependencies
    pub deps: DependencySet,
}

/// Arena of all packages reachable from a root
#[derive(Debug, Default)]
pub struct PackageGraph {
    /// Edge direction: dependency -> dependent
    graph: DiGraph<PackageNode, ()>,

    node_map: HashMap<Hash, NodeIndex>,
}

impl PackageGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Reads the package at `location` and everything it depends on
    ///
    /// Any missing or malformed manifest aborts the whole traversal.
    pub fn gather<S>(source: &S, root: &Hash, location: &Path) -> Result<Self, GraphError>
    where
        S: PackageSource + ?Sized,
    {
        let mut graph = Self::new();
        let mut visiting = DependencySet::new();
        graph.gather_deps(source, root, location, &mut visiting)?;
        Ok(graph)
    }

    /// Memoized by hash: a package shared by several dependents is read once
    fn gather_deps<S>(
        &mut self,
        source: &S,
        hash: &Hash,
        location: &Path,
        visiting: &mut DependencySet,
    ) -> Result<NodeIndex, GraphError>
    where
        S: PackageSource + ?Sized,
    {
        if let Some(idx) = self.node_map.get(hash) {
            return Ok(*idx);
        }
        if !visiting.add(hash.clone()) {
            return Err(GraphError::CycleDetected(hash.clone()));
        }

        let manifest = source
            .read_manifest(location)
            .map_err(|source| GraphError::Manifest {
                location: location.to_path_buf(),
                source,
            })?;

        let mut direct_deps = DependencySet::new();
        let mut deps = DependencySet::new();
        let mut children = Vec::with_capacity(manifest.deps.len());

        for dep in &manifest.deps {
            let dep_location = source.dependency_location(&dep.hash, &dep.name);
            let dep_idx = self.gather_deps(source, &dep.hash, &dep_location, visiting)?;

            direct_deps.add(dep.hash.clone());
            deps.add(dep.hash.clone());
            // Closure propagation
            deps.extend_from(&self.graph[dep_idx].deps);
            children.push(dep_idx);
        }

        visiting.remove_all(std::iter::once(hash));

        let idx = self.graph.add_node(PackageNode {
            hash: hash.clone(),
            name: manifest.name,
            path: manifest.path,
            direct_deps,
            deps,
        });
        self.node_map.insert(hash.clone(), idx);
        for child in children {
            self.graph.update_edge(child, idx, ());
        }

        Ok(idx)
    }

    pub fn node(&self, hash: &Hash) -> Option<&PackageNode> {
        self.node_map.get(hash).map(|idx| &self.graph[*idx])
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.node_map.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.graph.node_weights()
    }

    /// Finds the single package carrying `name`
    pub fn find_by_name(&self, name: &str) -> Result<&PackageNode, GraphError> {
        let mut matches: Vec<&PackageNode> = self.nodes().filter(|n| n.name == name).collect();
        match matches.len() {
            0 => Err(GraphError::PackageNotFound(name.to_string())),
            1 => Ok(matches.remove(0)),
            _ => {
                let mut hashes: Vec<Hash> = matches.iter().map(|n| n.hash.clone()).collect();
                hashes.sort();
                Err(GraphError::AmbiguousName {
                    name: name.to_string(),
                    hashes,
                })
            }
        }
    }

    /// Every package whose closure contains `hash`
    ///
    /// Walks the dependency -> dependent edges from `hash`.
    pub fn reverse_deps(&self, hash: &Hash) -> DependencySet {
        let Some(&start) = self.node_map.get(hash) else {
            return DependencySet::new();
        };

        let mut dependents = DependencySet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                dependents.add(self.graph[idx].hash.clone());
            }
        }
        dependents
    }

    /// Sorted package names for a list of hashes
    pub fn names<'a>(&self, hashes: impl IntoIterator<Item = &'a Hash>) -> Vec<String> {
        let mut names: Vec<String> = hashes
            .into_iter()
            .filter_map(|hash| self.node(hash).map(|n| n.name.clone()))
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{Manifest, MemorySource};

    fn root() -> PathBuf {
        PathBuf::from(MemorySource::ROOT)
    }

    /// app -> b -> a, app -> c -> a
    fn diamond_source() -> MemorySource {
        let mut source = MemorySource::new();
        source.add_root(
            Manifest::new("app", "github.com/acme/app")
                .depends_on("QmB", "b")
                .depends_on("QmC", "c"),
        );
        source.add_package(
            "QmB",
            Manifest::new("b", "github.com/acme/b").depends_on("QmA", "a"),
        );
        source.add_package(
            "QmC",
            Manifest::new("c", "github.com/acme/c").depends_on("QmA", "a"),
        );
        source.add_package("QmA", Manifest::new("a", "github.com/acme/a"));
        source
    }

    #[test]
    fn gathers_transitive_closure() {
        let graph = PackageGraph::gather(&diamond_source(), &Hash::root(), &root()).unwrap();

        assert_eq!(graph.len(), 4);
        let app = graph.node(&Hash::root()).unwrap();
        assert_eq!(app.direct_deps.len(), 2);
        assert_eq!(app.deps.len(), 3);
        assert!(app.deps.contains(&Hash::from("QmA")));
        assert!(!app.direct_deps.contains(&Hash::from("QmA")));
    }

    #[test]
    fn shared_dependency_is_stored_once() {
        let graph = PackageGraph::gather(&diamond_source(), &Hash::root(), &root()).unwrap();

        let named_a = graph.nodes().filter(|n| n.name == "a").count();
        assert_eq!(named_a, 1);
    }

    #[test]
    fn missing_manifest_aborts_traversal() {
        let mut source = MemorySource::new();
        source.add_root(Manifest::new("app", "github.com/acme/app").depends_on("QmB", "b"));

        let result = PackageGraph::gather(&source, &Hash::root(), &root());
        assert!(matches!(result, Err(GraphError::Manifest { .. })));
    }

    #[test]
    fn cycle_is_reported() {
        let mut source = MemorySource::new();
        source.add_root(Manifest::new("app", "github.com/acme/app").depends_on("QmA", "a"));
        source.add_package(
            "QmA",
            Manifest::new("a", "github.com/acme/a").depends_on("QmB", "b"),
        );
        source.add_package(
            "QmB",
            Manifest::new("b", "github.com/acme/b").depends_on("QmA", "a"),
        );

        let result = PackageGraph::gather(&source, &Hash::root(), &root());
        assert!(matches!(result, Err(GraphError::CycleDetected(h)) if h == Hash::from("QmA")));
    }

    #[test]
    fn reverse_deps_uses_full_closure() {
        let graph = PackageGraph::gather(&diamond_source(), &Hash::root(), &root()).unwrap();

        let rev = graph.reverse_deps(&Hash::from("QmA"));
        assert_eq!(
            rev,
            [Hash::root(), Hash::from("QmB"), Hash::from("QmC")]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn reverse_deps_agrees_with_closures() {
        let graph = PackageGraph::gather(&diamond_source(), &Hash::root(), &root()).unwrap();

        for node in graph.nodes() {
            let from_closures: DependencySet = graph
                .nodes()
                .filter(|n| n.deps.contains(&node.hash))
                .map(|n| n.hash.clone())
                .collect();
            assert_eq!(graph.reverse_deps(&node.hash), from_closures, "{}", node.name);
        }
        assert!(graph.reverse_deps(&Hash::root()).is_empty());
        assert!(graph.reverse_deps(&Hash::from("QmZ")).is_empty());
    }

    #[test]
    fn find_by_name() {
        let graph = PackageGraph::gather(&diamond_source(), &Hash::root(), &root()).unwrap();

        assert_eq!(graph.find_by_name("c").unwrap().hash, Hash::from("QmC"));
        assert!(matches!(
            graph.find_by_name("zzz"),
            Err(GraphError::PackageNotFound(_))
        ));
    }

    #[test]
    fn find_by_name_rejects_two_versions() {
        let mut source = MemorySource::new();
        source.add_root(
            Manifest::new("app", "github.com/acme/app")
                .depends_on("QmA1", "a")
                .depends_on("QmB", "b"),
        );
        source.add_package(
            "QmB",
            Manifest::new("b", "github.com/acme/b").depends_on("QmA2", "a"),
        );
        source.add_package("QmA1", Manifest::new("a", "github.com/acme/a"));
        source.add_package("QmA2", Manifest::new("a", "github.com/acme/a"));

        let graph = PackageGraph::gather(&source, &Hash::root(), &root()).unwrap();
        assert!(matches!(
            graph.find_by_name("a"),
            Err(GraphError::AmbiguousName { hashes, .. }) if hashes.len() == 2
        ));
    }

    #[test]
    fn names_are_sorted() {
        let graph = PackageGraph::gather(&diamond_source(), &Hash::root(), &root()).unwrap();
        let names = graph.names(&[Hash::from("QmC"), Hash::from("QmA"), Hash::from("QmB")]);
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
