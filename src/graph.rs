//! Dependency graphs between modules.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use petgraph::{
    Direction,
    algo::{condensation, tarjan_scc, toposort},
    graph::{DiGraph, NodeIndex},
};

use crate::module::ModuleId;

/// A directed graph whose edges point from a module to its dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<ModuleId, ()>,
    nodes: HashMap<ModuleId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `module` if it isn't already part of the graph.
    pub fn add_module(&mut self, module: ModuleId) -> NodeIndex {
        *self
            .nodes
            .entry(module)
            .or_insert_with(|| self.graph.add_node(module))
    }

    pub fn add_dependency(&mut self, from: ModuleId, to: ModuleId) {
        let from = self.add_module(from);
        let to = self.add_module(to);
        self.graph.update_edge(from, to, ());
    }

    pub fn contains(&self, module: ModuleId) -> bool {
        self.nodes.contains_key(&module)
    }

    /// The modules of the graph, in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.graph.node_weights().copied()
    }

    /// Orders the modules so that every module comes before its dependencies.
    ///
    /// A graph with cycles still gets a total order: each strongly connected
    /// component is ordered as a unit, and its members by id.
    pub fn topological_order(&self) -> Vec<ModuleId> {
        if let Ok(indices) = toposort(&self.graph, None) {
            return indices.into_iter().map(|idx| self.graph[idx]).collect();
        }

        let condensed = condensation(self.graph.clone(), true);

        match toposort(&condensed, None) {
            Ok(components) => components
                .into_iter()
                .flat_map(|idx| {
                    let mut members = condensed[idx].clone();
                    members.sort();
                    members
                })
                .collect(),
            // unreachable once condensed, but never loop or fail over it
            Err(_) => self.modules().collect(),
        }
    }

    /// Finds every elementary cyclic loop of the graph.
    ///
    /// Each module starts a depth-first search over the modules of its own
    /// strongly connected component with a larger id, so a loop is found
    /// exactly once, from its smallest member. Loops are reported starting
    /// at that member.
    pub fn cyclic_loops(&self) -> Vec<Box<[ModuleId]>> {
        let components = tarjan_scc(&self.graph);
        let mut component = HashMap::new();
        for (index, members) in components.into_iter().enumerate() {
            for node in members {
                component.insert(node, index);
            }
        }

        let mut starts = self.graph.node_indices().collect::<Vec<_>>();
        starts.sort_by_key(|&node| self.graph[node]);

        let mut search = LoopSearch {
            graph: &self.graph,
            component,
            start: NodeIndex::end(),
            path: Vec::new(),
            on_path: HashSet::new(),
            loops: IndexSet::new(),
        };

        for start in starts {
            search.start = start;
            search.visit(start);
        }

        search.loops.into_iter().collect()
    }
}

struct LoopSearch<'a> {
    graph: &'a DiGraph<ModuleId, ()>,
    component: HashMap<NodeIndex, usize>,
    start: NodeIndex,
    path: Vec<NodeIndex>,
    on_path: HashSet<NodeIndex>,
    loops: IndexSet<Box<[ModuleId]>>,
}

impl LoopSearch<'_> {
    /// Whether `node` may appear on a loop rooted at the current start.
    fn admits(&self, node: NodeIndex) -> bool {
        self.graph[node] > self.graph[self.start]
            && self.component.get(&node) == self.component.get(&self.start)
    }

    fn visit(&mut self, node: NodeIndex) {
        self.path.push(node);
        self.on_path.insert(node);

        let mut successors = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect::<Vec<_>>();
        successors.sort_by_key(|&next| self.graph[next]);
        successors.dedup();

        for next in successors {
            if next == self.start {
                self.record_loop();
            } else if !self.on_path.contains(&next) && self.admits(next) {
                self.visit(next);
            }
        }

        self.on_path.remove(&node);
        self.path.pop();
    }

    fn record_loop(&mut self) {
        let mut members = self
            .path
            .iter()
            .map(|&idx| self.graph[idx])
            .collect::<Vec<_>>();

        if let Some(min) = members
            .iter()
            .enumerate()
            .min_by_key(|&(_, id)| id)
            .map(|(i, _)| i)
        {
            members.rotate_left(min);
        }

        self.loops.insert(members.into_boxed_slice());
    }
}
