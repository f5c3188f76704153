//! Forward dependency edges with interned edge sets and a reverse index.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::file_id::FileId;

/// A sorted, deduplicated set of dependency ids, shared between every file
/// that has exactly the same dependencies.
pub type DependencySet = Arc<[FileId]>;

/// File-to-file dependency graph keyed by [`FileId`].
///
/// Forward edges are canonical. A file with no entry has no data yet, which is
/// distinct from a file whose dependency set is explicitly empty. Cycles and
/// self-edges are allowed.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: Vec<Option<DependencySet>>,
    reverse: Vec<BTreeSet<FileId>>,
    interned: HashSet<DependencySet>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the dependency set of `file`.
    pub fn set_dependencies(&mut self, file: FileId, deps: impl IntoIterator<Item = FileId>) {
        let mut deps: Vec<FileId> = deps.into_iter().collect();
        deps.sort_unstable();
        deps.dedup();

        self.grow(file);
        for &dep in &deps {
            self.grow(dep);
        }

        if let Some(old) = self.forward[file.index()].take() {
            for dep in old.iter() {
                self.reverse[dep.index()].remove(&file);
            }
            self.release(old);
        }

        let set = self.intern(deps);
        for dep in set.iter() {
            self.reverse[dep.index()].insert(file);
        }
        self.forward[file.index()] = Some(set);
    }

    /// Drops all edge data for `file`. Edges pointing at `file` are kept.
    pub fn remove(&mut self, file: FileId) {
        if let Some(old) = self.forward.get_mut(file.index()).and_then(Option::take) {
            for dep in old.iter() {
                self.reverse[dep.index()].remove(&file);
            }
            self.release(old);
        }
    }

    /// Returns the dependency set of `file`, or `None` if it has no data.
    pub fn dependencies(&self, file: FileId) -> Option<&DependencySet> {
        self.forward.get(file.index()).and_then(Option::as_ref)
    }

    /// Returns every file whose dependency set contains `file`.
    pub fn dependents(&self, file: FileId) -> impl Iterator<Item = FileId> + '_ {
        self.reverse
            .get(file.index())
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Returns `true` if `from` depends directly on `to`.
    pub fn has_edge(&self, from: FileId, to: FileId) -> bool {
        self.dependencies(from)
            .is_some_and(|deps| deps.binary_search(&to).is_ok())
    }

    /// Returns `true` if `file` has a dependency set, even an empty one.
    pub fn contains(&self, file: FileId) -> bool {
        self.dependencies(file).is_some()
    }

    /// Iterates over files with data and their dependency sets, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FileId, &DependencySet)> {
        self.forward.iter().enumerate().filter_map(|(idx, deps)| {
            deps.as_ref()
                .map(|d| (FileId::from_raw(idx as u32), d))
        })
    }

    /// Returns the number of distinct dependency sets currently in use.
    pub fn distinct_sets(&self) -> usize {
        self.interned.len()
    }

    /// Computes a dependency level for each of the first `file_count` files.
    ///
    /// Files in the same strongly connected component share a level, and a
    /// component's level is one more than the highest level among the
    /// components it depends on. Processing files by ascending level therefore
    /// sees every dependency outside a cycle finalized first.
    pub fn levels(&self, file_count: usize) -> Vec<u32> {
        let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(file_count, 0);
        for _ in 0..file_count {
            graph.add_node(());
        }
        for (file, deps) in self.iter() {
            if file.index() >= file_count {
                continue;
            }
            for dep in deps.iter().filter(|d| d.index() < file_count) {
                graph.add_edge(NodeIndex::new(file.index()), NodeIndex::new(dep.index()), ());
            }
        }

        // Tarjan yields components in reverse topological order, so every
        // component's dependencies have already been assigned a level.
        let components = tarjan_scc(&graph);
        let mut component_of = vec![0usize; file_count];
        for (idx, component) in components.iter().enumerate() {
            for node in component {
                component_of[node.index()] = idx;
            }
        }

        let mut component_level = vec![0u32; components.len()];
        for (idx, component) in components.iter().enumerate() {
            let mut level = 0;
            for node in component {
                for dep in graph.neighbors(*node) {
                    let dep_component = component_of[dep.index()];
                    if dep_component != idx {
                        level = level.max(component_level[dep_component] + 1);
                    }
                }
            }
            component_level[idx] = level;
        }

        (0..file_count)
            .map(|i| component_level[component_of[i]])
            .collect()
    }

    fn grow(&mut self, file: FileId) {
        let needed = file.index() + 1;
        if self.forward.len() < needed {
            self.forward.resize(needed, None);
            self.reverse.resize_with(needed, BTreeSet::new);
        }
    }

    fn intern(&mut self, deps: Vec<FileId>) -> DependencySet {
        if let Some(existing) = self.interned.get(deps.as_slice()) {
            return Arc::clone(existing);
        }
        let set: DependencySet = Arc::from(deps);
        self.interned.insert(Arc::clone(&set));
        set
    }

    /// Forgets an interned set once only the intern table still holds it.
    fn release(&mut self, set: DependencySet) {
        if Arc::strong_count(&set) == 2 {
            self.interned.remove(&*set);
        }
    }
}
