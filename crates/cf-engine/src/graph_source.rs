//! Dependency graph source
//!
//! The engine does not own field dependency metadata; a [`GraphSource`]
//! supplies the reachability closure around a set of seed fields. The
//! storage-backed implementation lives with the embedder; [`StaticGraphSource`]
//! serves fixed schemas and tests.

use crate::error::EngineResult;
use async_trait::async_trait;
use cf_core::GraphEdge;
use std::collections::{HashMap, HashSet, VecDeque};

/// Supplies the field dependency edges reachable from a set of seed fields
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// All dependency edges in the undirected closure of `seed_field_ids`
    async fn dependent_graph(&self, seed_field_ids: &[String]) -> EngineResult<Vec<GraphEdge>>;
}

/// Graph source over a fixed, in-memory edge list
#[derive(Debug, Default)]
pub struct StaticGraphSource {
    edges: Vec<GraphEdge>,
}

impl StaticGraphSource {
    pub fn new(edges: Vec<GraphEdge>) -> Self {
        Self { edges }
    }
}

#[async_trait]
impl GraphSource for StaticGraphSource {
    async fn dependent_graph(&self, seed_field_ids: &[String]) -> EngineResult<Vec<GraphEdge>> {
        // Undirected BFS over the edge list, then return the edges whose
        // endpoints both landed in the visited set, preserving input order.
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            adjacency
                .entry(edge.from_field_id.as_str())
                .or_default()
                .push(edge.to_field_id.as_str());
            adjacency
                .entry(edge.to_field_id.as_str())
                .or_default()
                .push(edge.from_field_id.as_str());
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for seed in seed_field_ids {
            if visited.insert(seed.as_str()) {
                queue.push_back(seed.as_str());
            }
        }
        while let Some(current) = queue.pop_front() {
            for &neighbor in adjacency.get(current).into_iter().flatten() {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(self
            .edges
            .iter()
            .filter(|e| {
                visited.contains(e.from_field_id.as_str())
                    && visited.contains(e.to_field_id.as_str())
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "graph_source_test.rs"]
mod tests;
