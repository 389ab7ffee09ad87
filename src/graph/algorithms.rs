//! Graph algorithms for analysis

use crate::cluster::{CommunityId, Partition};
use crate::graph::InteractionGraph;
use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Distinct directed (source, target) pairs; parallel edges and kinds collapse
pub fn distinct_links(graph: &InteractionGraph) -> BTreeSet<(NodeIndex, NodeIndex)> {
    graph
        .inner()
        .edge_references()
        .map(|e| (e.source(), e.target()))
        .collect()
}

/// Weakly connected components of the interaction graph
pub fn weak_component_count(graph: &InteractionGraph) -> usize {
    connected_components(graph.inner())
}

/// Edge weights of every community's induced subgraph, keyed by handle pair.
///
/// One pass over the edges. Weights of parallel edges (of any kind) between
/// the same ordered pair are summed; communities without internal edges are
/// absent.
pub fn community_edge_weights(
    graph: &InteractionGraph,
    partition: &Partition,
) -> BTreeMap<CommunityId, HashMap<(String, String), f64>> {
    let inner = graph.inner();
    let mut weights: BTreeMap<CommunityId, HashMap<(String, String), f64>> = BTreeMap::new();

    for e in inner.edge_references() {
        let source = inner[e.source()].as_str();
        let target = inner[e.target()].as_str();
        let (Some(cs), Some(ct)) = (partition.community_of(source), partition.community_of(target))
        else {
            continue;
        };
        if cs != ct {
            continue;
        }
        *weights
            .entry(cs)
            .or_default()
            .entry((source.to_string(), target.to_string()))
            .or_insert(0.0) += e.weight().weight as f64;
    }

    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Edge, Extraction, InteractionKind};
    use crate::graph::{build_graph, BuildOptions};

    fn graph() -> InteractionGraph {
        let edge = |s: &str, t: &str, kind| Edge {
            source: s.into(),
            target: t.into(),
            kind,
            weight: 1,
            timestamp: None,
        };
        let extraction = Extraction {
            edges: vec![
                edge("a", "b", InteractionKind::Mention),
                edge("a", "b", InteractionKind::Retweet),
                edge("b", "c", InteractionKind::Mention),
                edge("x", "y", InteractionKind::Mention),
            ],
            isolates: vec!["z".into()],
        };
        build_graph(&extraction, BuildOptions::default())
    }

    #[test]
    fn links_collapse_kinds() {
        assert_eq!(distinct_links(&graph()).len(), 3);
    }

    #[test]
    fn components_include_isolates() {
        assert_eq!(weak_component_count(&graph()), 3);
    }

    #[test]
    fn community_weights_only_cover_internal_edges() {
        let g = graph();
        let partition = Partition::from_assignments([("a", 0), ("b", 0), ("c", 1), ("x", 2), ("y", 3)]);
        let weights = community_edge_weights(&g, &partition);

        assert_eq!(weights.keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(weights[&0].len(), 1);
        assert_eq!(weights[&0][&("a".to_string(), "b".to_string())], 2.0);
    }
}
