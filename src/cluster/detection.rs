//! Community detection using the multi-level Louvain heuristic

use crate::cluster::{CommunityId, Partition};
use crate::error::{AnalysisError, Result};
use crate::graph::{InteractionGraph, WeightedProjection};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Louvain parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LouvainConfig {
    /// Seed for the node visiting order; `None` draws from entropy
    pub seed: Option<u64>,

    /// Resolution; values above 1 favour smaller communities
    pub resolution: f64,

    /// Maximum number of aggregation levels
    pub max_levels: usize,

    /// Maximum local-moving sweeps per level
    pub max_sweeps: usize,

    /// A sweep must raise modularity by at least this much to continue
    pub min_modularity_gain: f64,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            seed: Some(42),
            resolution: 1.0,
            max_levels: 32,
            max_sweeps: 100,
            min_modularity_gain: 1e-7,
        }
    }
}

/// Result of a detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityDetection {
    /// Total partition over every graph node
    pub partition: Partition,

    /// Modularity of the partition on the undirected projection
    pub modularity: f64,

    /// Number of aggregation levels performed
    pub levels: usize,
}

/// Partition the graph by maximizing modularity on its undirected projection.
///
/// Fails with [`AnalysisError::InvalidGraph`] when the graph has no nodes or
/// no edges between distinct nodes.
pub fn detect_communities(
    graph: &InteractionGraph,
    config: &LouvainConfig,
) -> Result<CommunityDetection> {
    // Reject graphs that cannot be partitioned
    if graph.node_count() == 0 {
        return Err(AnalysisError::InvalidGraph("graph has no nodes".into()));
    }
    if graph.edge_count() == 0 {
        return Err(AnalysisError::InvalidGraph("graph has no edges".into()));
    }

    // Modularity is defined on the undirected weighted projection
    let projection = graph.undirected_projection();
    if projection.total_weight <= 0.0 {
        return Err(AnalysisError::InvalidGraph(
            "graph has no edges between distinct nodes".into(),
        ));
    }

    log::info!(
        "Running Louvain on {} nodes and {} undirected edges",
        projection.node_count,
        projection.edge_count()
    );
    log::debug!(
        "Projection memory usage: {:.2} MB",
        projection.memory_usage() as f64 / (1024.0 * 1024.0)
    );

    // Seeded RNG fixes the node visiting order
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // membership maps original nodes to the current level's communities
    let mut membership: Vec<usize> = (0..projection.node_count).collect();
    let mut current = projection.clone();
    let mut levels = 0;

    while levels < config.max_levels {
        let mut level = local_moving(&current, config, &mut rng);
        let community_count = renumber(&mut level);

        // No node moved: the partition is final
        if community_count == current.node_count {
            break;
        }

        // Push the level's assignment down to the original nodes and collapse
        for c in membership.iter_mut() {
            *c = level[*c];
        }
        current = current.aggregate(&level, community_count);
        levels += 1;

        log::debug!(
            "Level {}: {} communities, modularity {:.4}",
            levels,
            community_count,
            projection.modularity(&membership, config.resolution)
        );
    }

    // Score and relabel on the original projection
    let modularity = projection.modularity(&membership, config.resolution);
    let labels = rank_by_size(&membership);

    let partition = Partition::from_assignments(
        graph
            .nodes()
            .zip(membership.iter())
            .map(|(node, &c)| (node, labels[c])),
    );

    log::info!(
        "Found {} communities with modularity {:.4}",
        partition.community_count(),
        modularity
    );

    Ok(CommunityDetection {
        partition,
        modularity,
        levels,
    })
}

/// Greedily move nodes between neighbouring communities until no move helps
fn local_moving(g: &WeightedProjection, config: &LouvainConfig, rng: &mut StdRng) -> Vec<usize> {
    let n = g.node_count;
    let two_m = 2.0 * g.total_weight;
    let resolution = config.resolution;

    // Every node starts in its own community
    let degrees: Vec<f64> = (0..n).map(|node| g.degree(node)).collect();
    let mut membership: Vec<usize> = (0..n).collect();
    let mut totals = degrees.clone();

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    // Scratch space reused across nodes
    let mut link_weight = vec![0.0; n];
    let mut seen = vec![false; n];
    let mut touched: Vec<usize> = Vec::new();

    let mut modularity = g.modularity(&membership, resolution);

    for _ in 0..config.max_sweeps {
        let mut moves = 0;

        for &node in &order {
            let k = degrees[node];
            let current = membership[node];

            // Sum link weight towards each neighbouring community
            for (other, w) in g.neighbors(node) {
                let c = membership[other];
                if !seen[c] {
                    seen[c] = true;
                    touched.push(c);
                }
                link_weight[c] += w;
            }

            // Take the node out before evaluating where it fits best
            totals[current] -= k;

            let gain = |c: usize| link_weight[c] - resolution * totals[c] * k / two_m;
            // Staying put wins ties
            let mut best = current;
            let mut best_gain = gain(current);
            for &c in &touched {
                let candidate = gain(c);
                if candidate > best_gain + 1e-12 {
                    best = c;
                    best_gain = candidate;
                }
            }

            // Insert into the chosen community
            totals[best] += k;
            if best != current {
                membership[node] = best;
                moves += 1;
            }

            // Reset scratch
            for &c in &touched {
                link_weight[c] = 0.0;
                seen[c] = false;
            }
            touched.clear();
        }

        // Stop once a sweep no longer improves modularity enough
        let updated = g.modularity(&membership, resolution);
        if moves == 0 || updated - modularity < config.min_modularity_gain {
            break;
        }
        modularity = updated;
    }

    membership
}

/// Relabel communities as 0..count in order of first appearance
fn renumber(membership: &mut [usize]) -> usize {
    let mut mapping = vec![usize::MAX; membership.len()];
    let mut next = 0;
    for c in membership.iter_mut() {
        if mapping[*c] == usize::MAX {
            mapping[*c] = next;
            next += 1;
        }
        *c = mapping[*c];
    }
    next
}

/// Final labels: 0 for the largest community, ties by earliest member
fn rank_by_size(membership: &[usize]) -> Vec<CommunityId> {
    let count = membership.iter().copied().max().map_or(0, |c| c + 1);
    let mut sizes = vec![0usize; count];
    let mut first = vec![usize::MAX; count];
    for (node, &c) in membership.iter().enumerate() {
        sizes[c] += 1;
        first[c] = first[c].min(node);
    }

    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]).then(first[a].cmp(&first[b])));

    let mut labels = vec![0; count];
    for (rank, c) in order.into_iter().enumerate() {
        labels[c] = rank as CommunityId;
    }
    labels
}
