//! Graph construction module

use crate::data::{Edge, Extraction, InteractionKind};
use crate::graph::interaction::{Interaction, InteractionGraph};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How incoming edges are turned into graph edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Merge repeated (source, target, kind) edges into one weighted edge
    pub aggregate: bool,

    /// Keep edges whose source and target are the same user
    pub include_self_loops: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            aggregate: true,
            include_self_loops: true,
        }
    }
}

/// Builder for incrementally constructing an InteractionGraph
pub struct GraphBuilder {
    options: BuildOptions,

    graph: DiGraph<String, Interaction>,

    /// Mapping from handles to node indices
    id_to_index: HashMap<String, NodeIndex>,

    /// Aggregated edge per (source, target, kind)
    merged: HashMap<(NodeIndex, NodeIndex, InteractionKind), EdgeIndex>,

    dropped_self_loops: usize,
}

impl GraphBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self::with_capacity(options, 0)
    }

    /// Create a new graph builder with the given node capacity
    pub fn with_capacity(options: BuildOptions, capacity: usize) -> Self {
        Self {
            options,
            graph: DiGraph::with_capacity(capacity, capacity),
            id_to_index: HashMap::with_capacity(capacity),
            merged: HashMap::new(),
            dropped_self_loops: 0,
        }
    }

    /// Get or create the node for the given handle
    pub fn get_or_create_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(id) {
            return idx;
        }

        let idx = self.graph.add_node(id.to_string());
        self.id_to_index.insert(id.to_string(), idx);
        idx
    }

    /// Add one extracted edge
    pub fn add_edge(&mut self, edge: &Edge) {
        if edge.source == edge.target && !self.options.include_self_loops {
            self.dropped_self_loops += 1;
            // The user still exists even when the loop is discarded
            self.get_or_create_node(&edge.source);
            return;
        }

        let src = self.get_or_create_node(&edge.source);
        let dst = self.get_or_create_node(&edge.target);

        let payload = Interaction {
            kind: edge.kind,
            weight: edge.weight,
            timestamp: edge.timestamp,
        };

        if !self.options.aggregate {
            self.graph.add_edge(src, dst, payload);
            return;
        }

        match self.merged.get(&(src, dst, edge.kind)) {
            Some(&existing) => {
                let current = &mut self.graph[existing];
                current.weight += edge.weight;
                current.timestamp = match (current.timestamp, edge.timestamp) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
            }
            None => {
                let idx = self.graph.add_edge(src, dst, payload);
                self.merged.insert((src, dst, edge.kind), idx);
            }
        }
    }

    /// Add every edge and isolate of an extraction
    pub fn add_extraction(&mut self, extraction: &Extraction) {
        for edge in &extraction.edges {
            self.add_edge(edge);
        }
        for isolate in &extraction.isolates {
            self.get_or_create_node(isolate);
        }
    }

    /// Finish construction
    pub fn build(self) -> InteractionGraph {
        if self.dropped_self_loops > 0 {
            log::info!("Dropped {} self-loop edges", self.dropped_self_loops);
        }
        log::info!(
            "Built graph with {} nodes and {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        InteractionGraph::from_parts(self.graph, self.id_to_index)
    }
}

/// Build a graph from an extraction in one step
pub fn build_graph(extraction: &Extraction, options: BuildOptions) -> InteractionGraph {
    let mut builder = GraphBuilder::with_capacity(options, extraction.edges.len());
    builder.add_extraction(extraction);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(s: &str, t: &str) -> Edge {
        Edge {
            source: s.into(),
            target: t.into(),
            kind: InteractionKind::Mention,
            weight: 1,
            timestamp: None,
        }
    }

    fn extraction(edges: Vec<Edge>) -> Extraction {
        Extraction {
            edges,
            isolates: vec!["lonely".into()],
        }
    }

    #[test]
    fn aggregation_increments_weight() {
        let ex = extraction(vec![mention("a", "b"), mention("a", "b"), mention("b", "a")]);
        let graph = build_graph(&ex, BuildOptions::default());

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.weight_between("a", "b"), 2);
        assert_eq!(graph.total_weight(), 3);
    }

    #[test]
    fn raw_mode_keeps_every_edge() {
        let ex = extraction(vec![mention("a", "b"), mention("a", "b")]);
        let graph = build_graph(
            &ex,
            BuildOptions {
                aggregate: false,
                include_self_loops: true,
            },
        );

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.weight_between("a", "b"), 2);
    }

    #[test]
    fn self_loops_follow_options() {
        let ex = extraction(vec![mention("a", "a"), mention("a", "b")]);

        let kept = build_graph(&ex, BuildOptions::default());
        assert_eq!(kept.edge_count(), 2);

        let dropped = build_graph(
            &ex,
            BuildOptions {
                aggregate: true,
                include_self_loops: false,
            },
        );
        assert_eq!(dropped.edge_count(), 1);
        assert!(dropped.contains("a"));
    }

    #[test]
    fn aggregated_timestamp_is_earliest() {
        let mut late = mention("a", "b");
        late.timestamp = Some(20);
        let mut early = mention("a", "b");
        early.timestamp = Some(10);

        let graph = build_graph(&extraction(vec![late, early]), BuildOptions::default());
        let (_, _, interaction) = graph.interactions().next().unwrap();
        assert_eq!(interaction.timestamp, Some(10));
    }
}
