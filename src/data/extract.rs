//! Edge extraction from raw post text (retweets and @-mentions)

use crate::data::records::TweetRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Marker that introduces the retweeted handle
pub const RETWEET_MARKER: &str = "RT @";

/// Which records and interactions become edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractMode {
    /// Every interaction; authors without interactions are kept as isolates
    #[default]
    All,
    /// Every interaction, no isolates
    AllNoIsolates,
    /// Only the retweeted user of records containing a retweet
    RtsOnly,
    /// Only mentions, from records that are not retweets
    AtMentionsOnly,
}

/// Interaction type carried by an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Retweet,
    Mention,
}

/// A directed interaction from `source` to `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: InteractionKind,
    pub weight: u32,
    pub timestamp: Option<i64>,
}

/// Edges extracted from a record sequence, plus authors with no incident edge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub edges: Vec<Edge>,
    pub isolates: Vec<String>,
}

fn handle_pattern() -> &'static Regex {
    static HANDLE: OnceLock<Regex> = OnceLock::new();
    HANDLE.get_or_init(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("handle pattern is valid"))
}

/// Position of the `@` that follows the first retweet marker, if any
fn retweet_anchor(text: &str) -> Option<usize> {
    text.find(RETWEET_MARKER).map(|pos| pos + RETWEET_MARKER.len() - 1)
}

/// Extract the interactions of a single post.
///
/// The retweet edge (if any) comes first, followed by every other handle in
/// textual order. Handles are lower-cased; nothing is filtered.
pub fn extract_interactions(author: &str, text: &str) -> Vec<Edge> {
    let anchor = retweet_anchor(text);
    let mut retweet = None;
    let mut mentions = Vec::new();

    for caps in handle_pattern().captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let target = name.as_str().to_lowercase();
        if retweet.is_none() && Some(whole.start()) == anchor {
            retweet = Some(target);
        } else {
            mentions.push(target);
        }
    }

    let edge = |target: String, kind| Edge {
        source: author.to_string(),
        target,
        kind,
        weight: 1,
        timestamp: None,
    };

    retweet
        .into_iter()
        .map(|t| edge(t, InteractionKind::Retweet))
        .chain(mentions.into_iter().map(|t| edge(t, InteractionKind::Mention)))
        .collect()
}

/// Convert records into an ordered edge sequence according to `mode`
pub fn extract_edges(records: &[TweetRecord], mode: ExtractMode) -> Extraction {
    let mut extraction = Extraction::default();
    let mut isolated: HashSet<&str> = HashSet::new();

    for record in records {
        if record.author.is_empty() {
            continue;
        }

        let is_retweet = record.text.contains(RETWEET_MARKER);
        let mut edges = match mode {
            ExtractMode::RtsOnly if !is_retweet => Vec::new(),
            ExtractMode::AtMentionsOnly if is_retweet => Vec::new(),
            _ => extract_interactions(&record.author, &record.text),
        };

        if mode == ExtractMode::RtsOnly {
            edges.retain(|e| e.kind == InteractionKind::Retweet);
        }

        if edges.is_empty() {
            if mode == ExtractMode::All && isolated.insert(record.author.as_str()) {
                extraction.isolates.push(record.author.clone());
            }
            continue;
        }

        for mut edge in edges {
            edge.timestamp = record.timestamp;
            extraction.edges.push(edge);
        }
    }

    // Authors reached by another record's edge are not isolated
    let connected: HashSet<&str> = extraction
        .edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();
    let isolates = std::mem::take(&mut extraction.isolates);
    extraction.isolates = isolates
        .into_iter()
        .filter(|author| !connected.contains(author.as_str()))
        .collect();

    log::info!(
        "Extracted {} edges and {} isolates from {} records",
        extraction.edges.len(),
        extraction.isolates.len(),
        records.len()
    );

    extraction
}
