//! Directed, weighted interaction multigraph

use crate::data::InteractionKind;
use crate::graph::projection::WeightedProjection;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Payload of one graph edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub kind: InteractionKind,

    /// Number of interactions this edge stands for
    pub weight: u32,

    /// Earliest timestamp seen for this edge
    pub timestamp: Option<i64>,
}

/// Interaction graph over user handles.
///
/// Built once by [`GraphBuilder`](crate::graph::GraphBuilder) and read-only
/// afterwards. Node indices follow first-appearance order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionGraph {
    graph: DiGraph<String, Interaction>,
    index: HashMap<String, NodeIndex>,
}

impl InteractionGraph {
    pub(crate) fn from_parts(
        graph: DiGraph<String, Interaction>,
        index: HashMap<String, NodeIndex>,
    ) -> Self {
        Self { graph, index }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edge objects (aggregated edges count once)
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Sum of all edge weights
    pub fn total_weight(&self) -> u64 {
        self.graph.edge_weights().map(|e| e.weight as u64).sum()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_id(&self, node: NodeIndex) -> &str {
        &self.graph[node]
    }

    /// Handles in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_weights().map(String::as_str)
    }

    /// Every edge as (source, target, payload), in insertion order
    pub fn interactions(&self) -> impl Iterator<Item = (&str, &str, &Interaction)> + '_ {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                e.weight(),
            )
        })
    }

    /// Underlying petgraph structure
    pub fn inner(&self) -> &DiGraph<String, Interaction> {
        &self.graph
    }

    /// Total weight of all edges from `source` to `target`, across kinds
    pub fn weight_between(&self, source: &str, target: &str) -> u64 {
        let (Some(s), Some(t)) = (self.node_index(source), self.node_index(target)) else {
            return 0;
        };
        self.graph
            .edges_connecting(s, t)
            .map(|e| e.weight().weight as u64)
            .sum()
    }

    /// Number of distinct neighbours in the given direction
    pub fn neighbor_count(&self, node: NodeIndex, direction: Direction) -> usize {
        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(node, direction).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors.len()
    }

    /// Aggregated (source, target, weight) edgelist, ordered by first appearance
    pub fn to_edgelist(&self) -> Vec<(String, String, u64)> {
        let mut weights: BTreeMap<(NodeIndex, NodeIndex), u64> = BTreeMap::new();
        let mut order = Vec::new();
        for e in self.graph.edge_references() {
            let key = (e.source(), e.target());
            let w = weights.entry(key).or_insert_with(|| {
                order.push(key);
                0
            });
            *w += e.weight().weight as u64;
        }

        order
            .into_iter()
            .map(|(s, t)| {
                (
                    self.graph[s].clone(),
                    self.graph[t].clone(),
                    weights[&(s, t)],
                )
            })
            .collect()
    }

    /// Undirected weighted projection used for community detection.
    ///
    /// Directions collapse, parallel and antiparallel edges sum their weights,
    /// self-loops are dropped. Projection node `i` is graph node index `i`.
    pub fn undirected_projection(&self) -> WeightedProjection {
        let edges = self
            .graph
            .edge_references()
            .filter(|e| e.source() != e.target())
            .map(|e| (e.source().index(), e.target().index(), e.weight().weight as f64));

        WeightedProjection::from_weighted_edges(
            self.node_count(),
            edges,
            vec![0.0; self.node_count()],
        )
    }
}
