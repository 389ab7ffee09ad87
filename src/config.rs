//! Configuration management for the community graph analyzer

use crate::cluster::detection::LouvainConfig;
use crate::cluster::metrics::DegreeDirection;
use crate::data::extract::ExtractMode;
use crate::error::{AnalysisError, Result};
use crate::graph::BuildOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Analysis parameters shared by every stage of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which records and interaction kinds become edges
    pub extract_mode: ExtractMode,

    /// Keep self-mentions and self-retweets as self-loops
    pub include_self_loops: bool,

    /// Merge repeated (source, target, kind) edges into one weighted edge
    pub aggregate_edges: bool,

    /// Seed for the Louvain node order; `None` draws from entropy
    pub seed: Option<u64>,

    /// Louvain resolution parameter
    pub resolution: f64,

    /// Number of largest communities kept for analysis
    pub top_communities: usize,

    /// Number of top connected nodes reported per community
    pub top_nodes: usize,

    /// Degree used to rank community members
    pub degree_direction: DegreeDirection,

    /// Minimum retweet count for a retweet to be ranked
    pub min_retweets: u64,

    /// Minimum count for hashtags and domains to be ranked
    pub min_content_count: u64,

    /// Number of ranked content items kept per ranking
    pub top_content: usize,

    /// Share of top in-degree members compared when matching communities
    pub match_proportion: f64,

    /// Similarity above which two communities count as a match
    pub match_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extract_mode: ExtractMode::All,
            include_self_loops: true,
            aggregate_edges: true,
            seed: Some(42),
            resolution: 1.0,
            top_communities: 10,
            top_nodes: 10,
            degree_direction: DegreeDirection::In,
            min_retweets: 5,
            min_content_count: 1,
            top_content: 10,
            match_proportion: 0.01,
            match_threshold: 0.3,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameters that make the analysis meaningless
    pub fn validate(&self) -> Result<()> {
        if self.top_communities == 0 {
            return Err(AnalysisError::Configuration(
                "top_communities must be at least 1".into(),
            ));
        }
        if self.top_nodes == 0 {
            return Err(AnalysisError::Configuration(
                "top_nodes must be at least 1".into(),
            ));
        }
        if self.top_content == 0 {
            return Err(AnalysisError::Configuration(
                "top_content must be at least 1".into(),
            ));
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(AnalysisError::Configuration(format!(
                "resolution must be a positive number, got {}",
                self.resolution
            )));
        }
        if !(self.match_proportion > 0.0 && self.match_proportion <= 1.0) {
            return Err(AnalysisError::Configuration(format!(
                "match_proportion must be in (0, 1], got {}",
                self.match_proportion
            )));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(AnalysisError::Configuration(format!(
                "match_threshold must be in [0, 1], got {}",
                self.match_threshold
            )));
        }
        Ok(())
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            aggregate: self.aggregate_edges,
            include_self_loops: self.include_self_loops,
        }
    }

    pub fn louvain(&self) -> LouvainConfig {
        LouvainConfig {
            seed: self.seed,
            resolution: self.resolution,
            ..LouvainConfig::default()
        }
    }
}
