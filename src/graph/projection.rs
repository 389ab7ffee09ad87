//! Compressed undirected weighted graph used by community detection

use std::collections::BTreeMap;
use std::mem;

/// Compressed sparse representation of an undirected weighted graph.
///
/// Every undirected edge is stored in both endpoints' adjacency ranges.
/// Self-loop weight is kept apart in `self_loops`; it is zero for a fresh
/// projection and carries intra-community weight once communities are
/// aggregated into super-nodes.
#[derive(Debug, Clone)]
pub struct WeightedProjection {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// offsets[i] to offsets[i+1] defines the adjacency range of node i
    pub offsets: Vec<u32>,

    /// Concatenated neighbour lists
    pub neighbors: Vec<u32>,

    /// Edge weight parallel to `neighbors`
    pub weights: Vec<f64>,

    /// Self-loop weight per node
    pub self_loops: Vec<f64>,

    /// Total edge weight m (each undirected edge and loop counted once)
    pub total_weight: f64,
}

impl WeightedProjection {
    /// Build from undirected weighted edges; parallel edges are merged and
    /// edges with equal endpoints are added to the node's self-loop weight.
    pub fn from_weighted_edges(
        node_count: usize,
        edges: impl IntoIterator<Item = (usize, usize, f64)>,
        mut self_loops: Vec<f64>,
    ) -> Self {
        self_loops.resize(node_count, 0.0);

        // Ordered keys keep adjacency layout independent of input order
        let mut merged: BTreeMap<(u32, u32), f64> = BTreeMap::new();
        for (a, b, w) in edges {
            if a == b {
                self_loops[a] += w;
                continue;
            }
            let key = if a < b { (a as u32, b as u32) } else { (b as u32, a as u32) };
            *merged.entry(key).or_insert(0.0) += w;
        }

        let mut counts = vec![0u32; node_count];
        for &(a, b) in merged.keys() {
            counts[a as usize] += 1;
            counts[b as usize] += 1;
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);
        let mut offset = 0;
        for &count in &counts {
            offset += count;
            offsets.push(offset);
        }

        let total_slots = offset as usize;
        let mut neighbors = vec![0u32; total_slots];
        let mut weights = vec![0.0; total_slots];
        let mut cursor: Vec<usize> = offsets[..node_count].iter().map(|&o| o as usize).collect();

        let mut total_weight: f64 = self_loops.iter().sum();
        for (&(a, b), &w) in &merged {
            for (from, to) in [(a, b), (b, a)] {
                let pos = cursor[from as usize];
                neighbors[pos] = to;
                weights[pos] = w;
                cursor[from as usize] += 1;
            }
            total_weight += w;
        }

        Self {
            node_count,
            offsets,
            neighbors,
            weights,
            self_loops,
            total_weight,
        }
    }

    /// Neighbours of a node with their edge weights (self-loop excluded)
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        self.neighbors[start..end]
            .iter()
            .zip(&self.weights[start..end])
            .map(|(&n, &w)| (n as usize, w))
    }

    /// Weighted degree; a self-loop contributes twice its weight
    pub fn degree(&self, node: usize) -> f64 {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        self.weights[start..end].iter().sum::<f64>() + 2.0 * self.self_loops[node]
    }

    /// Number of distinct undirected edges between different nodes
    pub fn edge_count(&self) -> usize {
        self.neighbors.len() / 2
    }

    /// Newman–Girvan modularity of a membership vector
    pub fn modularity(&self, membership: &[usize], resolution: f64) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        let m = self.total_weight;
        let communities = membership.iter().copied().max().map_or(0, |c| c + 1);

        let mut internal = vec![0.0; communities];
        let mut totals = vec![0.0; communities];

        for node in 0..self.node_count {
            let c = membership[node];
            totals[c] += self.degree(node);
            internal[c] += 2.0 * self.self_loops[node];
            for (other, w) in self.neighbors(node) {
                if membership[other] == c {
                    internal[c] += w;
                }
            }
        }

        internal
            .iter()
            .zip(&totals)
            .map(|(&inside, &tot)| inside / (2.0 * m) - resolution * (tot / (2.0 * m)).powi(2))
            .sum()
    }

    /// Collapse each community into a single node.
    ///
    /// `membership` must be numbered `0..community_count`. Weight between two
    /// communities becomes an edge; weight inside one becomes a self-loop.
    pub fn aggregate(&self, membership: &[usize], community_count: usize) -> Self {
        let mut loops = vec![0.0; community_count];
        let mut edges = Vec::new();

        for node in 0..self.node_count {
            let c = membership[node];
            loops[c] += self.self_loops[node];
            for (other, w) in self.neighbors(node) {
                if node < other {
                    edges.push((c, membership[other], w));
                }
            }
        }

        Self::from_weighted_edges(community_count, edges, loops)
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        mem::size_of::<Self>()
            + self.offsets.capacity() * mem::size_of::<u32>()
            + self.neighbors.capacity() * mem::size_of::<u32>()
            + self.weights.capacity() * mem::size_of::<f64>()
            + self.self_loops.capacity() * mem::size_of::<f64>()
    }
}
