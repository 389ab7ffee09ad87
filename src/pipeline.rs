//! End-to-end analysis of one time slice

use crate::cluster::detection::detect_communities;
use crate::cluster::metrics::{
    bridging_nodes, summarize, top_connected_nodes, BridgingNode, CommunityTies, EiReport,
    PartitionSummary, RankedNode, SharedTiesGrid,
};
use crate::cluster::{CommunityId, Partition};
use crate::config::Config;
use crate::content::{rank_content, ContentKind, ContentRanking, RankOptions};
use crate::data::{extract_edges, RecordBatch, SkippedRecord};
use crate::error::Result;
use crate::graph::build_graph;
use crate::temporal::TimeSlice;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything computed for one time slice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub period: String,

    pub record_count: usize,

    /// Input rows dropped during ingestion
    pub skipped_records: Vec<SkippedRecord>,

    pub node_count: usize,
    pub edge_count: usize,

    pub summary: PartitionSummary,

    /// Sizes of the retained communities
    pub community_sizes: BTreeMap<CommunityId, usize>,

    pub top_nodes: BTreeMap<CommunityId, Vec<RankedNode>>,

    pub ei: EiReport,

    /// Pairwise overlap of the retained communities, ordered by id
    pub overlap: Array2<f64>,

    pub shared_ties: SharedTiesGrid,

    pub bridging_nodes: Vec<BridgingNode>,

    pub top_retweets: ContentRanking,
    pub top_hashtags: ContentRanking,
    pub top_domains: ContentRanking,
}

/// A finished analysis: the slice (for later comparison) and its report
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Graph with the partition restricted to the retained communities
    pub slice: TimeSlice,

    /// Total partition produced by community detection
    pub partition: Partition,

    pub report: AnalysisReport,
}

/// Run extraction, graph construction, detection and every metric on a batch
pub fn analyze(batch: RecordBatch, period: &str, config: &Config) -> Result<Analysis> {
    config.validate()?;
    log::info!("Analyzing period '{}' ({} records)", period, batch.records.len());

    let extraction = extract_edges(&batch.records, config.extract_mode);
    let graph = build_graph(&extraction, config.build_options());

    let detection = detect_communities(&graph, &config.louvain())?;
    let retained = detection.partition.truncate(config.top_communities)?;
    let summary = summarize(&graph, &detection, &retained);

    log::info!(
        "Top {} communities hold {:.2}% of nodes and {:.2}% of edges",
        summary.retained_communities,
        summary.node_percentage,
        summary.edge_percentage
    );

    let top_nodes = top_connected_nodes(&graph, &retained, config.degree_direction, config.top_nodes)?;

    let ties = CommunityTies::compute(&graph, &retained);
    let ei = ties.ei_report();
    if let Some(mean) = ei.mean {
        log::info!("Mean EI index: {:.3}", mean);
    }

    let bridges = bridging_nodes(&graph, &retained);
    log::info!("Found {} bridging nodes", bridges.len());

    let rank = |kind, min_count| {
        rank_content(
            &batch.records,
            &retained,
            kind,
            RankOptions {
                top_n: config.top_content,
                min_count,
            },
        )
    };
    let top_retweets = rank(ContentKind::RetweetText, config.min_retweets)?;
    let top_hashtags = rank(ContentKind::Hashtag, config.min_content_count)?;
    let top_domains = rank(ContentKind::Domain, config.min_content_count)?;

    let report = AnalysisReport {
        period: period.to_string(),
        record_count: batch.records.len(),
        skipped_records: batch.skipped,
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        summary,
        community_sizes: retained.sizes(),
        top_nodes,
        ei,
        overlap: ties.overlap_matrix(),
        shared_ties: ties.shared_ties_grid(true),
        bridging_nodes: bridges,
        top_retweets,
        top_hashtags,
        top_domains,
    };

    Ok(Analysis {
        slice: TimeSlice {
            period: period.to_string(),
            graph,
            partition: retained,
        },
        partition: detection.partition,
        report,
    })
}
