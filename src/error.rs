//! Error taxonomy for the analysis pipeline

use crate::cluster::CommunityId;
use thiserror::Error;

/// Errors raised while loading, partitioning or analysing an interaction graph
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A single input record could not be parsed; callers skip it and continue
    #[error("malformed record at line {line}: {reason}")]
    InputFormat { line: u64, reason: String },

    /// The graph cannot be partitioned (no nodes, or no usable edges)
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A metric is undefined because the community has no incident edges
    #[error("community {community} has no incident edges")]
    DegenerateCommunity { community: CommunityId },

    /// A parameter was rejected before any computation started
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
