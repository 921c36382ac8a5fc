//! Property-based tests for update plans over random dependency DAGs.
//!
//! These tests verify that:
//! - Every package depending on the target appears exactly once
//! - Nothing else appears in the plan
//! - A package's level is the longest chain down to the target
//! - Triggers and indirect dependencies cover every in-scope dependency
//! - Gathering twice produces identical, identically ordered records

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use gx_cascade::domain::{
    gather, DependencyBubbler, Hash, Manifest, MemorySource, PackageGraph, PlanEntry,
};
use proptest::prelude::*;

/// Package `j` may depend on any package `i < j`; the root depends on all.
#[derive(Debug, Clone)]
struct Dag {
    edges: Vec<Vec<usize>>,
    target: usize,
}

impl Dag {
    fn len(&self) -> usize {
        self.edges.len()
    }

    /// Index `len()` stands for the root package
    fn deps_of(&self, pkg: usize) -> Vec<usize> {
        if pkg == self.len() {
            (0..self.len()).collect()
        } else {
            self.edges[pkg].clone()
        }
    }

    fn hash(&self, pkg: usize) -> Hash {
        if pkg == self.len() {
            Hash::root()
        } else {
            Hash::new(format!("Qm{}", pkg))
        }
    }

    fn source(&self) -> MemorySource {
        let mut source = MemorySource::new();
        for pkg in 0..self.len() {
            let mut manifest =
                Manifest::new(format!("pkg{}", pkg), format!("example.com/pkg{}", pkg));
            for &dep in &self.edges[pkg] {
                manifest = manifest.depends_on(self.hash(dep), format!("pkg{}", dep));
            }
            source.add_package(self.hash(pkg), manifest);
        }

        let mut root = Manifest::new("root", "example.com/root");
        for pkg in 0..self.len() {
            root = root.depends_on(self.hash(pkg), format!("pkg{}", pkg));
        }
        source.add_root(root);
        source
    }

    /// Longest chain from each package down to the target, for packages
    /// that depend on it
    fn expected_levels(&self) -> HashMap<usize, usize> {
        let mut levels = HashMap::new();
        // Dependencies always have lower indices, so one ascending pass works
        for pkg in self.target..=self.len() {
            if pkg == self.target {
                levels.insert(pkg, 0);
                continue;
            }
            let level = self
                .deps_of(pkg)
                .iter()
                .filter_map(|dep| levels.get(dep))
                .max()
                .map(|level| level + 1);
            if let Some(level) = level {
                levels.insert(pkg, level);
            }
        }
        levels
    }

    fn plan(&self) -> (PackageGraph, Vec<PlanEntry>) {
        let graph =
            PackageGraph::gather(&self.source(), &Hash::root(), Path::new(MemorySource::ROOT))
                .unwrap();
        let plan = DependencyBubbler::new(&graph)
            .plan(&self.hash(self.target))
            .unwrap();
        (graph, plan)
    }
}

fn arb_dag() -> impl Strategy<Value = Dag> {
    (1usize..10)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
                0..n,
            )
        })
        .prop_map(|(matrix, target)| {
            let edges = matrix
                .iter()
                .enumerate()
                .map(|(j, row)| (0..j).filter(|&i| row[i]).collect())
                .collect();
            Dag { edges, target }
        })
}

proptest! {
    /// The plan holds the target and its dependents, each exactly once.
    #[test]
    fn plan_covers_dependents_once(dag in arb_dag()) {
        let (_, plan) = dag.plan();

        let planned: Vec<Hash> = plan.iter().map(|e| e.hash.clone()).collect();
        let unique: BTreeSet<Hash> = planned.iter().cloned().collect();
        prop_assert_eq!(unique.len(), planned.len());

        let expected: BTreeSet<Hash> = dag
            .expected_levels()
            .keys()
            .map(|&pkg| dag.hash(pkg))
            .collect();
        prop_assert_eq!(unique, expected);
    }

    /// Levels are topological generations, not BFS distances.
    #[test]
    fn level_is_longest_chain(dag in arb_dag()) {
        let (_, plan) = dag.plan();

        let expected = dag.expected_levels();
        for (pkg, level) in expected {
            let entry = plan.iter().find(|e| e.hash == dag.hash(pkg)).unwrap();
            prop_assert_eq!(entry.level, level, "level of package {}", pkg);
        }
    }

    /// Triggers were resolved on the previous level.
    #[test]
    fn triggers_come_from_previous_level(dag in arb_dag()) {
        let (_, plan) = dag.plan();

        let level_of: HashMap<&Hash, usize> = plan.iter().map(|e| (&e.hash, e.level)).collect();
        for entry in &plan {
            if entry.level == 0 {
                prop_assert!(entry.direct_triggers.is_empty());
            } else {
                prop_assert!(!entry.direct_triggers.is_empty());
            }
            for trigger in &entry.direct_triggers {
                prop_assert_eq!(level_of[trigger] + 1, entry.level);
            }
        }
    }

    /// Every in-scope dependency is either a trigger or indirect, and
    /// `also_update` only names indirect dependencies.
    #[test]
    fn closure_is_split_between_triggers_and_indirect(dag in arb_dag()) {
        let (graph, plan) = dag.plan();
        let scope: BTreeSet<Hash> = plan.iter().map(|e| e.hash.clone()).collect();

        for entry in &plan {
            let indirect: BTreeSet<Hash> = entry.indirect_deps.iter().cloned().collect();
            prop_assert!(entry.also_update.iter().all(|h| indirect.contains(h)));
            prop_assert!(entry.direct_triggers.iter().all(|h| !indirect.contains(h)));

            let covered: BTreeSet<Hash> = indirect
                .iter()
                .chain(&entry.direct_triggers)
                .cloned()
                .collect();
            let in_scope: BTreeSet<Hash> = graph
                .node(&entry.hash)
                .unwrap()
                .deps
                .iter()
                .filter(|h| scope.contains(*h))
                .cloned()
                .collect();
            prop_assert_eq!(covered, in_scope);
        }
    }

    /// Gathering is deterministic and sorted by level.
    #[test]
    fn gather_is_idempotent(dag in arb_dag()) {
        let source = dag.source();
        let target = format!("pkg{}", dag.target);

        let first = gather(&source, Path::new(MemorySource::ROOT), &target).unwrap();
        let second = gather(&source, Path::new(MemorySource::ROOT), &target).unwrap();

        prop_assert_eq!(&first.todos, &second.todos);
        prop_assert!(first.todos.windows(2).all(|w| w[0].level <= w[1].level));
        prop_assert_eq!(first.todos.last().map(|t| t.name.as_str()), Some("root"));
    }
}
