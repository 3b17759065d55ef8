//! Field dependency graph and per-seed topological ordering

use crate::error::{CoreError, CoreResult};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeRef, NodeFiltered};
use std::collections::{HashMap, HashSet, VecDeque};

/// One directed dependency edge: `to_field_id` reads from `from_field_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from_field_id: String,
    pub to_field_id: String,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_field_id: from.into(),
            to_field_id: to.into(),
        }
    }
}

/// One entry in a linearized evaluation order: a field and the fields it
/// reads from within the ordered component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoItem {
    pub field_id: String,
    pub dependencies: Vec<String>,
}

/// A directed graph of field dependencies
///
/// Nodes are inserted in first-seen edge order, which makes every traversal
/// below deterministic for identical input.
#[derive(Debug)]
pub struct FieldGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl FieldGraph {
    /// Build the graph from a list of dependency edges.
    ///
    /// Parallel duplicate edges are collapsed; self-edges are ignored so a
    /// field referencing itself does not manufacture a cycle.
    pub fn from_edges(edges: &[GraphEdge]) -> Self {
        let mut graph = Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        };
        let mut seen = HashSet::new();

        for edge in edges {
            if edge.from_field_id == edge.to_field_id {
                continue;
            }
            let from = graph.add_field(&edge.from_field_id);
            let to = graph.add_field(&edge.to_field_id);
            if seen.insert((from, to)) {
                graph.graph.add_edge(from, to, ());
            }
        }

        graph
    }

    fn add_field(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(id) {
            idx
        } else {
            let idx = self.graph.add_node(id.to_string());
            self.node_map.insert(id.to_string(), idx);
            idx
        }
    }

    /// Check if a field exists in the graph
    pub fn contains(&self, field_id: &str) -> bool {
        self.node_map.contains_key(field_id)
    }

    /// All field ids in the graph, in insertion order
    pub fn field_ids(&self) -> Vec<String> {
        self.graph.node_indices().map(|i| self.graph[i].clone()).collect()
    }

    /// Produce the linearized evaluation order for `seed`: every field of the
    /// seed's (undirected) component, each appearing after all fields it
    /// reads from.
    ///
    /// A seed absent from the graph orders as just itself with no
    /// dependencies. Fails with [`CoreError::CircularDependency`] when the
    /// component admits no linear order.
    pub fn topological_order(&self, seed: &str) -> CoreResult<Vec<TopoItem>> {
        let Some(&start) = self.node_map.get(seed) else {
            return Ok(vec![TopoItem {
                field_id: seed.to_string(),
                dependencies: Vec::new(),
            }]);
        };

        let component = self.component_of(start);
        let filtered = NodeFiltered::from_fn(&self.graph, |n| component.contains(&n));

        let sorted = toposort(&filtered, None).map_err(|cycle| {
            let cycle_str = self.find_cycle_path(cycle.node_id());
            CoreError::CircularDependency { cycle: cycle_str }
        })?;

        Ok(sorted
            .into_iter()
            .map(|idx| TopoItem {
                field_id: self.graph[idx].clone(),
                dependencies: self.dependencies_of(idx, &component),
            })
            .collect())
    }

    /// Direct upstream dependencies of a node, restricted to `component`,
    /// in deterministic node order.
    fn dependencies_of(&self, idx: NodeIndex, component: &HashSet<NodeIndex>) -> Vec<String> {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, petgraph::Direction::Incoming)
            .map(|e| e.source())
            .filter(|n| component.contains(n))
            .collect();
        deps.sort();
        deps.dedup();
        deps.into_iter().map(|n| self.graph[n].clone()).collect()
    }

    /// Collect the undirected connected component containing `start` (BFS).
    fn component_of(&self, start: NodeIndex) -> HashSet<NodeIndex> {
        let mut visited = HashSet::new();
        visited.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for direction in [petgraph::Direction::Incoming, petgraph::Direction::Outgoing] {
                for edge in self.graph.edges_directed(current, direction) {
                    let neighbor = match direction {
                        petgraph::Direction::Incoming => edge.source(),
                        petgraph::Direction::Outgoing => edge.target(),
                    };
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        visited
    }

    /// Find a cycle path starting from a node for error reporting
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![self.graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].to_string());

            if target == start || visited.contains(&target) {
                break;
            }

            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
