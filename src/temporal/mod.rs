//! Community similarity between two time slices of the same population

use crate::cluster::metrics::{ranked_members, DegreeDirection};
use crate::cluster::{CommunityId, Partition};
use crate::error::{AnalysisError, Result};
use crate::graph::algorithms::community_edge_weights;
use crate::graph::InteractionGraph;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// A partitioned graph for one period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlice {
    pub period: String,
    pub graph: InteractionGraph,
    pub partition: Partition,
}

/// How two communities are compared
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMode {
    /// Jaccard over member sets
    Unweighted,
    /// Weighted Jaccard over the edge weights of the induced subgraphs
    Weighted,
    /// Weighted Jaccard over the top in-degree members, weighted by in-degree
    InDegree { proportion: f64 },
}

/// Similarity of every earlier community to every later community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    pub mode: SimilarityMode,

    /// Row labels (communities of the earlier slice)
    pub earlier: Vec<CommunityId>,

    /// Column labels (communities of the later slice)
    pub later: Vec<CommunityId>,

    pub scores: Array2<f64>,
}

/// Best later counterpart of an earlier community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMatch {
    pub earlier: CommunityId,

    /// `None` when no later community shares anything with it
    pub later: Option<CommunityId>,

    pub score: f64,

    /// Whether the score exceeds the match threshold
    pub accepted: bool,

    /// Members present in both communities
    pub shared_nodes: Vec<String>,
}

/// |A ∩ B| / |A ∪ B|; 0 when both sets are empty
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Σ min(a, b) / Σ max(a, b) over the union of keys.
///
/// 0 when the union weighs nothing, including a weightless profile compared
/// with itself.
pub fn weighted_jaccard<K: Eq + Hash>(a: &HashMap<K, f64>, b: &HashMap<K, f64>) -> f64 {
    let mut min_sum = 0.0;
    let mut max_sum = 0.0;

    for (key, &wa) in a {
        let wb = b.get(key).copied().unwrap_or(0.0);
        min_sum += wa.min(wb);
        max_sum += wa.max(wb);
    }
    for (key, &wb) in b {
        if !a.contains_key(key) {
            max_sum += wb;
        }
    }

    if max_sum <= 0.0 {
        return 0.0;
    }
    min_sum / max_sum
}

/// Per-community data one slice contributes to a comparison
enum Profile<'a> {
    Members(HashSet<&'a str>),
    Weights(HashMap<(String, String), f64>),
    Ranked(HashMap<&'a str, f64>),
}

/// In-degree of every partition member
fn in_degrees(slice: &TimeSlice) -> HashMap<String, f64> {
    ranked_members(&slice.graph, &slice.partition, DegreeDirection::In)
        .into_iter()
        .map(|r| (r.node, r.degree as f64))
        .collect()
}

fn profiles<'a>(
    slice: &'a TimeSlice,
    mode: SimilarityMode,
    degrees: &HashMap<String, f64>,
) -> Vec<(CommunityId, Profile<'a>)> {
    let ranked = match mode {
        SimilarityMode::InDegree { .. } => {
            ranked_members(&slice.graph, &slice.partition, DegreeDirection::In)
        }
        _ => Vec::new(),
    };
    let mut edge_weights = match mode {
        SimilarityMode::Weighted => community_edge_weights(&slice.graph, &slice.partition),
        _ => BTreeMap::new(),
    };

    slice
        .partition
        .communities()
        .into_iter()
        .map(|(id, members)| {
            let profile = match mode {
                SimilarityMode::Unweighted => Profile::Members(members.into_iter().collect()),
                SimilarityMode::Weighted => {
                    Profile::Weights(edge_weights.remove(&id).unwrap_or_default())
                }
                SimilarityMode::InDegree { proportion } => {
                    let keep = ((members.len() as f64 * proportion).ceil() as usize).max(1);
                    let top = ranked
                        .iter()
                        .filter(|r| r.community == id)
                        .take(keep)
                        .filter_map(|r| members.iter().find(|&&m| m == r.node).copied())
                        .map(|node| (node, degrees.get(node).copied().unwrap_or(0.0)))
                        .collect();
                    Profile::Ranked(top)
                }
            };
            (id, profile)
        })
        .collect()
}

/// Degree-weighted Jaccard: nodes weigh their in-degree in both slices
fn degree_weighted_jaccard(
    a: &HashMap<&str, f64>,
    b: &HashMap<&str, f64>,
    earlier: &HashMap<String, f64>,
    later: &HashMap<String, f64>,
) -> f64 {
    let weight = |node: &str| {
        earlier.get(node).copied().unwrap_or(0.0) + later.get(node).copied().unwrap_or(0.0)
    };

    let union: BTreeSet<&str> = a.keys().chain(b.keys()).copied().collect();
    let union_weight: f64 = union.iter().map(|&n| weight(n)).sum();
    if union_weight <= 0.0 {
        return 0.0;
    }
    let shared_weight: f64 = a
        .keys()
        .filter(|n| b.contains_key(*n))
        .map(|&n| weight(n))
        .sum();
    shared_weight / union_weight
}

/// Compare every community of `earlier` with every community of `later`
pub fn compare_slices(
    earlier: &TimeSlice,
    later: &TimeSlice,
    mode: SimilarityMode,
) -> Result<SimilarityMatrix> {
    if let SimilarityMode::InDegree { proportion } = mode {
        if !(proportion > 0.0 && proportion <= 1.0) {
            return Err(AnalysisError::Configuration(format!(
                "proportion must be in (0, 1], got {}",
                proportion
            )));
        }
    }

    log::info!(
        "Comparing communities of '{}' and '{}' ({:?})",
        earlier.period,
        later.period,
        mode
    );

    let (earlier_degrees, later_degrees) = match mode {
        SimilarityMode::InDegree { .. } => (in_degrees(earlier), in_degrees(later)),
        _ => (HashMap::new(), HashMap::new()),
    };

    let rows = profiles(earlier, mode, &earlier_degrees);
    let cols = profiles(later, mode, &later_degrees);

    let scored: Vec<Vec<f64>> = rows
        .par_iter()
        .map(|(_, a)| {
            cols.iter()
                .map(|(_, b)| match (a, b) {
                    (Profile::Members(a), Profile::Members(b)) => jaccard(a, b),
                    (Profile::Weights(a), Profile::Weights(b)) => weighted_jaccard(a, b),
                    (Profile::Ranked(a), Profile::Ranked(b)) => {
                        degree_weighted_jaccard(a, b, &earlier_degrees, &later_degrees)
                    }
                    _ => 0.0,
                })
                .collect()
        })
        .collect();

    let mut scores = Array2::zeros((rows.len(), cols.len()));
    for (i, row) in scored.into_iter().enumerate() {
        for (j, score) in row.into_iter().enumerate() {
            scores[[i, j]] = score;
        }
    }

    Ok(SimilarityMatrix {
        mode,
        earlier: rows.iter().map(|(id, _)| *id).collect(),
        later: cols.iter().map(|(id, _)| *id).collect(),
        scores,
    })
}

impl SimilarityMatrix {
    /// Score of a pair; 0 when either community is unknown
    pub fn score(&self, earlier: CommunityId, later: CommunityId) -> f64 {
        let i = self.earlier.iter().position(|&c| c == earlier);
        let j = self.later.iter().position(|&c| c == later);
        match (i, j) {
            (Some(i), Some(j)) => self.scores[[i, j]],
            _ => 0.0,
        }
    }

    /// Best later community for each earlier one.
    ///
    /// Ties go to the lower later id. A match is accepted when its score is
    /// strictly above `threshold`.
    pub fn best_matches(
        &self,
        earlier: &TimeSlice,
        later: &TimeSlice,
        threshold: f64,
    ) -> Result<Vec<CommunityMatch>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AnalysisError::Configuration(format!(
                "threshold must be in [0, 1], got {}",
                threshold
            )));
        }

        let matches = self
            .earlier
            .iter()
            .enumerate()
            .map(|(i, &from)| {
                let mut best: Option<(CommunityId, f64)> = None;
                for (j, &to) in self.later.iter().enumerate() {
                    let score = self.scores[[i, j]];
                    if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
                        best = Some((to, score));
                    }
                }

                let shared_nodes = match best {
                    Some((to, _)) => {
                        let later_members: HashSet<&str> =
                            later.partition.members(to).into_iter().collect();
                        earlier
                            .partition
                            .members(from)
                            .into_iter()
                            .filter(|n| later_members.contains(n))
                            .map(String::from)
                            .collect()
                    }
                    None => Vec::new(),
                };

                let score = best.map_or(0.0, |(_, s)| s);
                CommunityMatch {
                    earlier: from,
                    later: best.map(|(to, _)| to),
                    score,
                    accepted: score > threshold,
                    shared_nodes,
                }
            })
            .collect();

        Ok(matches)
    }
}
