//! Community analysis of retweet and mention networks
//!
//! Records are turned into a directed interaction graph, partitioned with a
//! seeded Louvain search, and described with community metrics, content
//! rankings and cross-period similarity.

pub mod cluster;
pub mod config;
pub mod content;
pub mod data;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod storage;
pub mod temporal;
pub mod viz;

pub use error::{AnalysisError, Result};
