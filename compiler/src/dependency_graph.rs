//! Dependency Graph for declaration ordering
//!
//! Nodes are declarations, keyed by `DeclId` and labelled with their fully
//! qualified name. An edge from A to B means A stores B inline (or needs one
//! of B's values), so B must be compiled before A. The topological sort is
//! deterministic: among declarations that are ready at the same time, the one
//! with the smallest name goes first.

use std::collections::{BTreeSet, HashSet};

use fxhash::FxHashMap;
use indexmap::IndexMap;

use crate::flat::DeclId;

/// Dependency graph for declaration compilation ordering
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Node labels, in insertion order
    nodes: IndexMap<DeclId, String>,

    /// A -> {B}: A depends on B
    edges: FxHashMap<DeclId, BTreeSet<DeclId>>,

    /// B -> {A}: A depends on B
    reverse_edges: FxHashMap<DeclId, BTreeSet<DeclId>>,
}

/// Result of dependency analysis
#[derive(Debug)]
pub struct DependencyAnalysis {
    /// Declarations in compilation order (dependencies first). Declarations
    /// on or behind a cycle are missing.
    pub compilation_order: Vec<DeclId>,

    pub circular_dependencies: Vec<CircularDependency>,
}

impl DependencyAnalysis {
    pub fn is_acyclic(&self) -> bool {
        self.circular_dependencies.is_empty()
    }
}

/// Represents a circular dependency cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularDependency {
    /// The cycle of declaration names, closed (e.g. ["A", "B", "A"])
    pub cycle: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, decl: DeclId, name: impl Into<String>) {
        self.nodes.insert(decl, name.into());
        self.edges.entry(decl).or_default();
        self.reverse_edges.entry(decl).or_default();
    }

    /// Record that `from` depends on `to`. Both must already be nodes.
    pub fn add_edge(&mut self, from: DeclId, to: DeclId) {
        debug_assert!(self.nodes.contains_key(&from) && self.nodes.contains_key(&to));
        self.edges.entry(from).or_default().insert(to);
        self.reverse_edges.entry(to).or_default().insert(from);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn contains(&self, decl: DeclId) -> bool {
        self.nodes.contains_key(&decl)
    }

    /// Compute a compilation order and report cycles.
    pub fn analyze(&self) -> DependencyAnalysis {
        let compilation_order = self.topological_sort();
        let circular_dependencies = if compilation_order.len() < self.nodes.len() {
            self.find_cycles()
        } else {
            Vec::new()
        };

        DependencyAnalysis {
            compilation_order,
            circular_dependencies,
        }
    }

    /// Kahn's algorithm with the ready set ordered by name
    fn topological_sort(&self) -> Vec<DeclId> {
        let mut in_degree: FxHashMap<DeclId, usize> = self
            .nodes
            .keys()
            .map(|decl| (*decl, self.edges.get(decl).map_or(0, BTreeSet::len)))
            .collect();

        let mut ready: BTreeSet<(&str, DeclId)> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(decl, _)| (self.nodes[decl].as_str(), *decl))
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.pop_first() {
            let (_, decl) = next;
            result.push(decl);

            if let Some(dependents) = self.reverse_edges.get(&decl) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert((self.nodes[dependent].as_str(), *dependent));
                        }
                    }
                }
            }
        }

        result
    }

    /// Detect cycles using DFS, visiting nodes in name order
    fn find_cycles(&self) -> Vec<CircularDependency> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        let mut roots: Vec<(&str, DeclId)> = self
            .nodes
            .iter()
            .map(|(decl, name)| (name.as_str(), *decl))
            .collect();
        roots.sort();

        for (_, decl) in roots {
            if !visited.contains(&decl) {
                self.detect_cycles(decl, &mut visited, &mut rec_stack, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn detect_cycles(
        &self,
        node: DeclId,
        visited: &mut HashSet<DeclId>,
        rec_stack: &mut HashSet<DeclId>,
        path: &mut Vec<DeclId>,
        cycles: &mut Vec<CircularDependency>,
    ) {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        if let Some(neighbors) = self.edges.get(&node) {
            for &neighbor in neighbors {
                if !visited.contains(&neighbor) {
                    self.detect_cycles(neighbor, visited, rec_stack, path, cycles);
                } else if rec_stack.contains(&neighbor) {
                    if let Some(cycle_start) = path.iter().position(|n| *n == neighbor) {
                        let mut cycle: Vec<String> = path[cycle_start..]
                            .iter()
                            .map(|decl| self.nodes[decl].clone())
                            .collect();
                        cycle.push(self.nodes[&neighbor].clone());
                        cycles.push(CircularDependency { cycle });
                    }
                }
            }
        }

        path.pop();
        rec_stack.remove(&node);
    }

    /// Everything `decl` depends on, transitively
    pub fn get_all_dependencies(&self, decl: DeclId) -> HashSet<DeclId> {
        let mut result = HashSet::new();
        let mut stack = vec![decl];

        while let Some(current) = stack.pop() {
            if let Some(deps) = self.edges.get(&current) {
                for &dep in deps {
                    if result.insert(dep) {
                        stack.push(dep);
                    }
                }
            }
        }

        result
    }

    pub fn get_direct_dependencies(&self, decl: DeclId) -> Vec<DeclId> {
        self.edges
            .get(&decl)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn get_direct_dependents(&self, decl: DeclId) -> Vec<DeclId> {
        self.reverse_edges
            .get(&decl)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl CircularDependency {
    pub fn format_error(&self) -> String {
        format!("cycle: {}", self.cycle.join(" -> "))
    }
}
