//! Frequency ranking of content, globally and per community

use crate::cluster::{CommunityId, Partition};
use crate::content::ContentKind;
use crate::data::TweetRecord;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Ranking parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankOptions {
    /// Items kept per ranking
    pub top_n: usize,

    /// Items seen fewer times than this are dropped
    pub min_count: u64,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            min_count: 1,
        }
    }
}

/// A counted content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    pub key: String,
    pub count: u64,

    /// Community of the credited node, when there is exactly one
    pub community: Option<CommunityId>,
}

/// Rankings of one content kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRanking {
    pub kind: ContentKind,
    pub global: Vec<RankedItem>,
    pub by_community: BTreeMap<CommunityId, Vec<RankedItem>>,

    /// Occurrences credited to nodes outside the partition
    pub unassigned: u64,
}

/// Counts in first-occurrence order
#[derive(Default)]
struct Tally {
    slots: HashMap<String, usize>,
    items: Vec<(String, u64, Option<CommunityId>, bool)>,
}

impl Tally {
    fn add(&mut self, key: &str, community: Option<CommunityId>) {
        match self.slots.get(key) {
            Some(&slot) => {
                let item = &mut self.items[slot];
                item.1 += 1;
                if item.2 != community {
                    item.3 = true;
                }
            }
            None => {
                self.slots.insert(key.to_string(), self.items.len());
                self.items.push((key.to_string(), 1, community, false));
            }
        }
    }

    fn rank(self, options: &RankOptions) -> Vec<RankedItem> {
        let mut ranked: Vec<(usize, RankedItem)> = self
            .items
            .into_iter()
            .enumerate()
            .filter(|(_, (_, count, _, _))| *count >= options.min_count)
            .map(|(order, (key, count, community, mixed))| {
                (
                    order,
                    RankedItem {
                        key,
                        count,
                        community: if mixed { None } else { community },
                    },
                )
            })
            .collect();

        // Stable on first occurrence for equal counts
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));
        ranked.truncate(options.top_n);
        ranked.into_iter().map(|(_, item)| item).collect()
    }
}

/// Rank the content of `kind` found in `records`.
///
/// Each occurrence is credited to a node (see [`ContentKind`]) and, through
/// the partition, to that node's community. Occurrences from nodes outside
/// the partition count only in the global ranking.
pub fn rank_content(
    records: &[TweetRecord],
    partition: &Partition,
    kind: ContentKind,
    options: RankOptions,
) -> Result<ContentRanking> {
    if options.top_n == 0 {
        return Err(AnalysisError::Configuration(
            "number of ranked items must be at least 1".into(),
        ));
    }

    let mut global = Tally::default();
    let mut per_community: BTreeMap<CommunityId, Tally> = BTreeMap::new();
    let mut unassigned = 0;

    for record in records {
        for item in kind.extract(&record.author, &record.text) {
            let community = partition.community_of(&item.node);
            global.add(&item.key, community);
            match community {
                Some(id) => per_community.entry(id).or_default().add(&item.key, Some(id)),
                None => unassigned += 1,
            }
        }
    }

    let ranking = ContentRanking {
        kind,
        global: global.rank(&options),
        by_community: per_community
            .into_iter()
            .map(|(id, tally)| (id, tally.rank(&options)))
            .filter(|(_, items)| !items.is_empty())
            .collect(),
        unassigned,
    };

    log::info!(
        "Ranked {}: {} global items across {} communities",
        kind.label(),
        ranking.global.len(),
        ranking.by_community.len()
    );

    Ok(ranking)
}
