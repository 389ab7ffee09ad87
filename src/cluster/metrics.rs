//! Community statistics and metrics
//!
//! Every metric looks only at edges whose endpoints are both assigned in the
//! partition it is given, so a truncated or restricted partition scopes the
//! analysis to that community subset. Parallel edges between the same
//! ordered pair count once.

use crate::cluster::detection::CommunityDetection;
use crate::cluster::{CommunityId, Partition};
use crate::error::{AnalysisError, Result};
use crate::graph::algorithms::distinct_links;
use crate::graph::InteractionGraph;
use ndarray::Array2;
use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Which edges count towards a node's degree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeDirection {
    #[default]
    In,
    Out,
    Total,
}

/// A community member with its degree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedNode {
    pub node: String,
    pub community: CommunityId,
    pub degree: usize,
}

/// Directed links with both endpoints in the partition, with their communities
fn scoped_links(
    graph: &InteractionGraph,
    partition: &Partition,
) -> Vec<(NodeIndex, NodeIndex, CommunityId, CommunityId)> {
    distinct_links(graph)
        .into_iter()
        .filter_map(|(s, t)| {
            let cs = partition.community_of(graph.node_id(s))?;
            let ct = partition.community_of(graph.node_id(t))?;
            Some((s, t, cs, ct))
        })
        .collect()
}

/// All partition members ranked by degree (descending), ties by handle
pub fn ranked_members(
    graph: &InteractionGraph,
    partition: &Partition,
    direction: DegreeDirection,
) -> Vec<RankedNode> {
    let links = scoped_links(graph, partition);

    let mut in_neighbors: BTreeMap<NodeIndex, BTreeSet<NodeIndex>> = BTreeMap::new();
    let mut out_neighbors: BTreeMap<NodeIndex, BTreeSet<NodeIndex>> = BTreeMap::new();
    for &(s, t, _, _) in &links {
        out_neighbors.entry(s).or_default().insert(t);
        in_neighbors.entry(t).or_default().insert(s);
    }

    let members: Vec<(&str, CommunityId)> = partition.assignments().collect();

    let mut ranked: Vec<RankedNode> = members
        .par_iter()
        .map(|&(node, community)| {
            let degree = graph.node_index(node).map_or(0, |idx| {
                let incoming = in_neighbors.get(&idx);
                let outgoing = out_neighbors.get(&idx);
                match direction {
                    DegreeDirection::In => incoming.map_or(0, BTreeSet::len),
                    DegreeDirection::Out => outgoing.map_or(0, BTreeSet::len),
                    DegreeDirection::Total => {
                        let mut all: BTreeSet<NodeIndex> = BTreeSet::new();
                        all.extend(incoming.into_iter().flatten());
                        all.extend(outgoing.into_iter().flatten());
                        all.len()
                    }
                }
            });
            RankedNode {
                node: node.to_string(),
                community,
                degree,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.node.cmp(&b.node)));
    ranked
}

/// The `limit` best connected members of each community
pub fn top_connected_nodes(
    graph: &InteractionGraph,
    partition: &Partition,
    direction: DegreeDirection,
    limit: usize,
) -> Result<BTreeMap<CommunityId, Vec<RankedNode>>> {
    if limit == 0 {
        return Err(AnalysisError::Configuration(
            "number of top nodes must be at least 1".into(),
        ));
    }

    let mut top: BTreeMap<CommunityId, Vec<RankedNode>> = BTreeMap::new();
    for node in ranked_members(graph, partition, direction) {
        let slot = top.entry(node.community).or_default();
        if slot.len() < limit {
            slot.push(node);
        }
    }
    Ok(top)
}

/// How a community's ties are split between inside and other communities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieProfile {
    pub community: CommunityId,

    /// Edges with both endpoints in the community
    pub internal: u64,

    /// Edges from another community into this one
    pub incoming: u64,

    /// Edges from this community into another one
    pub outgoing: u64,

    pub outgoing_to: BTreeMap<CommunityId, u64>,
    pub incoming_from: BTreeMap<CommunityId, u64>,
}

impl TieProfile {
    pub fn external(&self) -> u64 {
        self.incoming + self.outgoing
    }

    pub fn total(&self) -> u64 {
        self.internal + self.external()
    }

    /// Krackhardt & Stern EI index: (external - internal) / (external + internal)
    pub fn ei_index(&self) -> Result<f64> {
        let total = self.total();
        if total == 0 {
            return Err(AnalysisError::DegenerateCommunity {
                community: self.community,
            });
        }
        Ok((self.external() as f64 - self.internal as f64) / total as f64)
    }
}

/// EI indices of every community in a partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EiReport {
    /// EI per community; `None` where the community has no edges
    pub indices: BTreeMap<CommunityId, Option<f64>>,

    /// Communities whose EI index is undefined
    pub undefined: Vec<CommunityId>,

    /// Mean over the defined indices
    pub mean: Option<f64>,
}

/// Per-community shares of a focal community's ties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedTiesGrid {
    /// Axis labels for rows and columns
    pub communities: Vec<CommunityId>,

    /// Whether cells are proportions of the focal total or raw counts
    pub proportions: bool,

    /// internal[i]: focal community i's internal ties
    pub internal: Vec<f64>,

    /// outgoing[[i, j]]: ties from focal community i to community j
    pub outgoing: Array2<f64>,

    /// incoming[[i, j]]: ties from community j into focal community i
    pub incoming: Array2<f64>,
}

impl SharedTiesGrid {
    /// Incoming minus outgoing ties of each focal community
    pub fn balance(&self) -> Vec<f64> {
        (0..self.communities.len())
            .map(|i| self.incoming.row(i).sum() - self.outgoing.row(i).sum())
            .collect()
    }
}

/// Tie profiles of all communities in a partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityTies {
    profiles: BTreeMap<CommunityId, TieProfile>,
}

impl CommunityTies {
    /// Classify every scoped edge as internal or crossing
    pub fn compute(graph: &InteractionGraph, partition: &Partition) -> Self {
        let mut profiles: BTreeMap<CommunityId, TieProfile> = partition
            .community_ids()
            .into_iter()
            .map(|id| {
                (
                    id,
                    TieProfile {
                        community: id,
                        ..TieProfile::default()
                    },
                )
            })
            .collect();

        for (_, _, from, to) in scoped_links(graph, partition) {
            if from == to {
                if let Some(p) = profiles.get_mut(&from) {
                    p.internal += 1;
                }
                continue;
            }
            if let Some(p) = profiles.get_mut(&from) {
                p.outgoing += 1;
                *p.outgoing_to.entry(to).or_insert(0) += 1;
            }
            if let Some(p) = profiles.get_mut(&to) {
                p.incoming += 1;
                *p.incoming_from.entry(from).or_insert(0) += 1;
            }
        }

        Self { profiles }
    }

    pub fn profile(&self, id: CommunityId) -> Option<&TieProfile> {
        self.profiles.get(&id)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &TieProfile> + '_ {
        self.profiles.values()
    }

    pub fn community_ids(&self) -> Vec<CommunityId> {
        self.profiles.keys().copied().collect()
    }

    /// EI index of one community
    pub fn ei_index(&self, id: CommunityId) -> Result<f64> {
        match self.profiles.get(&id) {
            Some(profile) => profile.ei_index(),
            None => Err(AnalysisError::DegenerateCommunity { community: id }),
        }
    }

    /// EI indices of all communities; undefined ones are listed, not fatal
    pub fn ei_report(&self) -> EiReport {
        let mut report = EiReport::default();

        for profile in self.profiles.values() {
            match profile.ei_index() {
                Ok(ei) => {
                    report.indices.insert(profile.community, Some(ei));
                }
                Err(e) => {
                    log::warn!("{}", e);
                    report.indices.insert(profile.community, None);
                    report.undefined.push(profile.community);
                }
            }
        }

        let defined: Vec<f64> = report.indices.values().flatten().copied().collect();
        if !defined.is_empty() {
            report.mean = Some(defined.iter().mean());
        }
        report
    }

    /// Distinct edges between `a` and `b`, both directions
    pub fn crossing(&self, a: CommunityId, b: CommunityId) -> u64 {
        let Some(pa) = self.profiles.get(&a) else {
            return 0;
        };
        pa.outgoing_to.get(&b).copied().unwrap_or(0) + pa.incoming_from.get(&b).copied().unwrap_or(0)
    }

    /// Symmetric overlap in [0, 1]: 2 * crossing(a, b) / (external(a) + external(b)).
    ///
    /// 1 means the two communities only tie to each other; 0 means they share
    /// no ties or have no external ties at all. A community has overlap 1 with
    /// itself.
    pub fn overlap(&self, a: CommunityId, b: CommunityId) -> f64 {
        if a == b {
            return 1.0;
        }
        let external = |id| self.profiles.get(&id).map_or(0, TieProfile::external);
        let boundary = external(a) + external(b);
        if boundary == 0 {
            return 0.0;
        }
        2.0 * self.crossing(a, b) as f64 / boundary as f64
    }

    /// Overlap between every pair of communities, ordered as `community_ids()`
    pub fn overlap_matrix(&self) -> Array2<f64> {
        let ids = self.community_ids();
        Array2::from_shape_fn((ids.len(), ids.len()), |(i, j)| self.overlap(ids[i], ids[j]))
    }

    /// Break each community's external ties down by the other community
    pub fn shared_ties_grid(&self, proportions: bool) -> SharedTiesGrid {
        let ids = self.community_ids();
        let n = ids.len();
        let mut outgoing = Array2::zeros((n, n));
        let mut incoming = Array2::zeros((n, n));
        let mut internal = vec![0.0; n];

        for (i, &focal) in ids.iter().enumerate() {
            let profile = &self.profiles[&focal];
            let scale = if proportions && profile.total() > 0 {
                profile.total() as f64
            } else {
                1.0
            };

            internal[i] = profile.internal as f64 / scale;
            for (j, other) in ids.iter().enumerate() {
                outgoing[[i, j]] = profile.outgoing_to.get(other).copied().unwrap_or(0) as f64 / scale;
                incoming[[i, j]] = profile.incoming_from.get(other).copied().unwrap_or(0) as f64 / scale;
            }
        }

        SharedTiesGrid {
            communities: ids,
            proportions,
            internal,
            outgoing,
            incoming,
        }
    }
}

/// A node with ties into other communities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgingNode {
    pub node: String,
    pub community: CommunityId,

    /// Distinct communities touched by the node's edges, its own included
    pub communities_touched: usize,

    /// Edges to or from members of other communities
    pub crossing_edges: usize,

    /// Other communities the node is tied to
    pub other_communities: Vec<CommunityId>,
}

/// Nodes whose edges span more than one community.
///
/// Ranked by communities touched, then crossing edges (both descending), then
/// handle. Self-loops never cross.
pub fn bridging_nodes(graph: &InteractionGraph, partition: &Partition) -> Vec<BridgingNode> {
    let mut crossings: BTreeMap<NodeIndex, (CommunityId, usize, BTreeSet<CommunityId>)> =
        BTreeMap::new();

    for (s, t, cs, ct) in scoped_links(graph, partition) {
        if cs == ct {
            continue;
        }
        for (node, own, other) in [(s, cs, ct), (t, ct, cs)] {
            let entry = crossings
                .entry(node)
                .or_insert_with(|| (own, 0, BTreeSet::new()));
            entry.1 += 1;
            entry.2.insert(other);
        }
    }

    let mut bridges: Vec<BridgingNode> = crossings
        .into_iter()
        .map(|(idx, (community, crossing_edges, others))| BridgingNode {
            node: graph.node_id(idx).to_string(),
            community,
            communities_touched: others.len() + 1,
            crossing_edges,
            other_communities: others.into_iter().collect(),
        })
        .collect();

    bridges.sort_by(|a, b| {
        b.communities_touched
            .cmp(&a.communities_touched)
            .then(b.crossing_edges.cmp(&a.crossing_edges))
            .then_with(|| a.node.cmp(&b.node))
    });
    bridges
}

/// Headline numbers of a detection run after truncation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub modularity: f64,

    /// Communities found by detection
    pub community_count: usize,

    /// Communities kept for analysis
    pub retained_communities: usize,

    /// Percentage of graph nodes inside the retained communities
    pub node_percentage: f64,

    /// Percentage of distinct links with both endpoints retained
    pub edge_percentage: f64,

    /// Weakly connected components of the interaction graph
    pub components: usize,
}

pub fn summarize(
    graph: &InteractionGraph,
    detection: &CommunityDetection,
    retained: &Partition,
) -> PartitionSummary {
    let links = distinct_links(graph);
    let kept_nodes: HashSet<&str> = retained.assignments().map(|(n, _)| n).collect();
    let kept_links = links
        .iter()
        .filter(|(s, t)| kept_nodes.contains(graph.node_id(*s)) && kept_nodes.contains(graph.node_id(*t)))
        .count();

    let percentage = |part: usize, whole: usize| {
        if whole == 0 {
            0.0
        } else {
            part as f64 / whole as f64 * 100.0
        }
    };

    PartitionSummary {
        modularity: detection.modularity,
        community_count: detection.partition.community_count(),
        retained_communities: retained.community_count(),
        node_percentage: percentage(retained.len(), graph.node_count()),
        edge_percentage: percentage(kept_links, links.len()),
        components: crate::graph::algorithms::weak_component_count(graph),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Edge, Extraction, InteractionKind};
    use crate::graph::{build_graph, BuildOptions};

    fn graph_from(pairs: &[(&str, &str)]) -> InteractionGraph {
        let extraction = Extraction {
            edges: pairs
                .iter()
                .map(|&(s, t)| Edge {
                    source: s.into(),
                    target: t.into(),
                    kind: InteractionKind::Mention,
                    weight: 1,
                    timestamp: None,
                })
                .collect(),
            isolates: vec!["loner".into()],
        };
        build_graph(&extraction, BuildOptions::default())
    }

    /// Community 0 = {a, b, c}, 1 = {d, e}, 2 = {loner}
    fn fixture() -> (InteractionGraph, Partition) {
        let graph = graph_from(&[
            ("a", "b"),
            ("a", "b"),
            ("b", "c"),
            ("c", "a"),
            ("d", "e"),
            ("a", "d"),
            ("e", "c"),
        ]);
        let partition = Partition::from_assignments([
            ("a", 0),
            ("b", 0),
            ("c", 0),
            ("d", 1),
            ("e", 1),
            ("loner", 2),
        ]);
        (graph, partition)
    }

    #[test]
    fn ei_counts_distinct_edges() {
        let (graph, partition) = fixture();
        let ties = CommunityTies::compute(&graph, &partition);

        let p0 = ties.profile(0).unwrap();
        assert_eq!((p0.internal, p0.incoming, p0.outgoing), (3, 1, 1));
        assert!((ties.ei_index(0).unwrap() - (-0.2)).abs() < 1e-12);

        // d->e internal, a->d incoming, e->c outgoing
        assert!((ties.ei_index(1).unwrap() - (1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn ei_is_bounded() {
        let (graph, partition) = fixture();
        let report = CommunityTies::compute(&graph, &partition).ei_report();
        for ei in report.indices.values().flatten() {
            assert!((-1.0..=1.0).contains(ei));
        }
    }

    #[test]
    fn isolated_community_is_degenerate_but_not_fatal() {
        let (graph, partition) = fixture();
        let ties = CommunityTies::compute(&graph, &partition);

        assert!(matches!(
            ties.ei_index(2),
            Err(AnalysisError::DegenerateCommunity { community: 2 })
        ));

        let report = ties.ei_report();
        assert_eq!(report.undefined, vec![2]);
        assert_eq!(report.indices[&2], None);
        assert!(report.indices[&0].is_some());
        let expected_mean = (-0.2 + 1.0 / 3.0) / 2.0;
        assert!((report.mean.unwrap() - expected_mean).abs() < 1e-12);
    }

    #[test]
    fn fully_insular_community_scores_minus_one() {
        let graph = graph_from(&[("a", "b"), ("b", "a"), ("x", "y")]);
        let partition = Partition::from_assignments([("a", 0), ("b", 0), ("x", 1), ("y", 1)]);
        let ties = CommunityTies::compute(&graph, &partition);
        assert_eq!(ties.ei_index(0).unwrap(), -1.0);
    }

    #[test]
    fn overlap_is_symmetric_and_normalized() {
        let (graph, partition) = fixture();
        let ties = CommunityTies::compute(&graph, &partition);

        assert_eq!(ties.overlap(0, 1), ties.overlap(1, 0));
        assert_eq!(ties.overlap(0, 1), 1.0);
        assert_eq!(ties.overlap(0, 2), 0.0);

        let matrix = ties.overlap_matrix();
        assert_eq!(matrix.shape(), &[3, 3]);
        assert_eq!(matrix[[1, 1]], 1.0);
    }

    #[test]
    fn shared_ties_grid_uses_focal_totals() {
        let (graph, partition) = fixture();
        let grid = CommunityTies::compute(&graph, &partition).shared_ties_grid(true);

        assert_eq!(grid.communities, vec![0, 1, 2]);
        assert!((grid.internal[0] - 0.6).abs() < 1e-12);
        assert!((grid.outgoing[[0, 1]] - 0.2).abs() < 1e-12);
        assert!((grid.incoming[[0, 1]] - 0.2).abs() < 1e-12);
        assert_eq!(grid.internal[2], 0.0);
        assert!(grid.balance()[0].abs() < 1e-12);
    }

    #[test]
    fn truncated_partition_ignores_dropped_nodes() {
        let (graph, partition) = fixture();
        let only_first = partition.restrict(&[0]);
        let ties = CommunityTies::compute(&graph, &only_first);
        assert_eq!(ties.ei_index(0).unwrap(), -1.0);
    }

    #[test]
    fn members_ranked_by_degree_then_name() {
        let (graph, partition) = fixture();
        let ranked = ranked_members(&graph, &partition, DegreeDirection::In);
        let names: Vec<&str> = ranked.iter().map(|r| r.node.as_str()).collect();
        // c <- b, e ; a <- c ; b <- a ; d <- a ; e <- d ; loner none
        assert_eq!(names, vec!["c", "a", "b", "d", "e", "loner"]);
        assert_eq!(ranked[0].degree, 2);

        let top = top_connected_nodes(&graph, &partition, DegreeDirection::Total, 1).unwrap();
        assert_eq!(top[&0][0].node, "a");
        assert_eq!(top[&1].len(), 1);
        assert!(top_connected_nodes(&graph, &partition, DegreeDirection::In, 0).is_err());
    }

    #[test]
    fn bridges_rank_by_reach() {
        let (graph, partition) = fixture();
        let bridges = bridging_nodes(&graph, &partition);
        let names: Vec<&str> = bridges.iter().map(|b| b.node.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "d", "e"]);
        assert!(bridges.iter().all(|b| b.communities_touched == 2));
        assert_eq!(bridges[0].other_communities, vec![1]);
    }
}
