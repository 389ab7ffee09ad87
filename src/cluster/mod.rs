//! Community partition and analysis module

pub mod detection;
pub mod metrics;

use crate::error::{AnalysisError, Result};
use crate::graph::InteractionGraph;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Community identifier; 0 is the largest community of a detection run
pub type CommunityId = u32;

/// Assignment of nodes to disjoint communities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    assignments: BTreeMap<String, CommunityId>,
}

impl Partition {
    pub fn from_assignments<I, S>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (S, CommunityId)>,
        S: Into<String>,
    {
        Self {
            assignments: assignments
                .into_iter()
                .map(|(node, id)| (node.into(), id))
                .collect(),
        }
    }

    pub fn community_of(&self, node: &str) -> Option<CommunityId> {
        self.assignments.get(node).copied()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.assignments.contains_key(node)
    }

    /// Number of assigned nodes
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// (node, community) pairs ordered by node
    pub fn assignments(&self) -> impl Iterator<Item = (&str, CommunityId)> + '_ {
        self.assignments.iter().map(|(node, &id)| (node.as_str(), id))
    }

    /// Members of every community, each list sorted by handle
    pub fn communities(&self) -> BTreeMap<CommunityId, Vec<&str>> {
        let mut communities: BTreeMap<CommunityId, Vec<&str>> = BTreeMap::new();
        for (node, id) in self.assignments() {
            communities.entry(id).or_default().push(node);
        }
        communities
    }

    pub fn members(&self, id: CommunityId) -> Vec<&str> {
        self.assignments()
            .filter(|&(_, c)| c == id)
            .map(|(node, _)| node)
            .collect()
    }

    pub fn community_ids(&self) -> Vec<CommunityId> {
        self.assignments.values().copied().sorted().dedup().collect()
    }

    pub fn community_count(&self) -> usize {
        self.community_ids().len()
    }

    pub fn sizes(&self) -> BTreeMap<CommunityId, usize> {
        self.assignments.values().copied().counts().into_iter().collect()
    }

    /// The `n` most populous communities, largest first (ties by id)
    pub fn largest(&self, n: usize) -> Result<Vec<CommunityId>> {
        if n == 0 {
            return Err(AnalysisError::Configuration(
                "number of communities to keep must be at least 1".into(),
            ));
        }
        Ok(self
            .sizes()
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
            .take(n)
            .map(|(id, _)| id)
            .collect())
    }

    /// Keep only the `n` largest communities; asking for more than exist keeps all
    pub fn truncate(&self, n: usize) -> Result<Partition> {
        let keep = self.largest(n)?;
        Ok(self.restrict(&keep))
    }

    /// Keep only the listed communities
    pub fn restrict(&self, ids: &[CommunityId]) -> Partition {
        let keep: HashSet<CommunityId> = ids.iter().copied().collect();
        Partition {
            assignments: self
                .assignments
                .iter()
                .filter(|(_, id)| keep.contains(id))
                .map(|(node, &id)| (node.clone(), id))
                .collect(),
        }
    }

    /// Whether every node of the graph is assigned
    pub fn covers(&self, graph: &InteractionGraph) -> bool {
        graph.nodes().all(|node| self.contains(node))
    }

    /// Derived view of one community and its induced subgraph
    pub fn community(&self, graph: &InteractionGraph, id: CommunityId) -> Option<Community> {
        let members: Vec<String> = self.members(id).into_iter().map(String::from).collect();
        if members.is_empty() {
            return None;
        }

        let internal_edges = graph
            .to_edgelist()
            .into_iter()
            .filter(|(s, t, _)| self.community_of(s) == Some(id) && self.community_of(t) == Some(id))
            .collect();

        Some(Community {
            id,
            size: members.len(),
            members,
            internal_edges,
        })
    }
}

/// A community: its members plus the edges with both endpoints inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: CommunityId,

    pub size: usize,

    /// Member handles, sorted
    pub members: Vec<String>,

    /// Aggregated (source, target, weight) edges of the induced subgraph
    pub internal_edges: Vec<(String, String, u64)>,
}
