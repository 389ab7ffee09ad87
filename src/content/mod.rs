//! Content extraction: retweeted messages, hashtags and link domains

pub mod ranking;

pub use ranking::{rank_content, ContentRanking, RankOptions, RankedItem};

use crate::data::extract::RETWEET_MARKER;
use crate::data::records::normalize_handle;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::{Host, Url};

/// Kind of rankable content found in post text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// A retweeted message, credited to the retweeted user
    RetweetText,
    /// A hashtag, credited to the author
    Hashtag,
    /// The registrable domain of a linked URL, credited to the author
    Domain,
}

/// One occurrence of a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Normalized key used for counting
    pub key: String,

    /// Node the occurrence is attributed to
    pub node: String,
}

fn hashtag_pattern() -> &'static Regex {
    static HASHTAG: OnceLock<Regex> = OnceLock::new();
    HASHTAG.get_or_init(|| Regex::new(r"#(\w+)").expect("hashtag pattern is valid"))
}

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r#"(?i)\bhttps?://[^\s<>"']+"#).expect("url pattern is valid")
    })
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [
        ContentKind::RetweetText,
        ContentKind::Hashtag,
        ContentKind::Domain,
    ];

    /// Items of this kind found in one post
    pub fn extract(&self, author: &str, text: &str) -> Vec<ContentItem> {
        match self {
            ContentKind::RetweetText => retweet_item(text).into_iter().collect(),
            ContentKind::Hashtag => hashtag_pattern()
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|tag| ContentItem {
                    key: tag.as_str().to_lowercase(),
                    node: author.to_string(),
                })
                .collect(),
            ContentKind::Domain => url_pattern()
                .find_iter(text)
                .filter_map(|link| link_domain(link.as_str()))
                .map(|key| ContentItem {
                    key,
                    node: author.to_string(),
                })
                .collect(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::RetweetText => "retweets",
            ContentKind::Hashtag => "hashtags",
            ContentKind::Domain => "domains",
        }
    }
}

/// A retweet is text starting with the marker and carrying `user:` before the message
fn retweet_item(text: &str) -> Option<ContentItem> {
    let trimmed = text.trim();
    if !trimmed.starts_with(RETWEET_MARKER) {
        return None;
    }
    let rest = &trimmed[RETWEET_MARKER.len()..];
    let colon = rest.find(':')?;
    let user = normalize_handle(&rest[..colon]);
    if user.is_empty() || !user.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let key = trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    Some(ContentItem { key, node: user })
}

/// Second-level labels registries sell names under (`bbc.co.uk`, `abc.net.au`)
const GENERIC_SECOND_LEVEL: [&str; 9] = ["ac", "co", "com", "edu", "gov", "ne", "net", "or", "org"];

/// Registrable domain of a linked URL; IP hosts are returned as-is
pub fn link_domain(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    match url.host()? {
        Host::Domain(domain) => registrable_domain(domain),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

/// Reduce a host name to its registrable domain.
///
/// Without a public-suffix list the last two labels are kept, or three when a
/// generic second-level label sits under a two-letter country code.
pub fn registrable_domain(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.').to_lowercase();
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();

    let keep = match labels.as_slice() {
        [] => return None,
        [.., second, tld]
            if labels.len() >= 3 && tld.len() == 2 && GENERIC_SECOND_LEVEL.contains(second) =>
        {
            3
        }
        _ => 2,
    };

    Some(labels[labels.len().saturating_sub(keep)..].join("."))
}
