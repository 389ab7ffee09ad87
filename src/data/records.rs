//! CSV ingestion of raw interaction records

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One raw post: who wrote it and what it says
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetRecord {
    /// Author handle, lower-cased and trimmed
    pub author: String,

    /// Raw post text
    pub text: String,

    /// Optional unix timestamp (third CSV column)
    pub timestamp: Option<i64>,
}

impl TweetRecord {
    pub fn new(author: &str, text: &str) -> Self {
        Self {
            author: normalize_handle(author),
            text: text.to_string(),
            timestamp: None,
        }
    }
}

/// A row that was dropped during ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub line: u64,
    pub reason: String,
}

/// Parsed records plus the rows that had to be skipped
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordBatch {
    pub records: Vec<TweetRecord>,
    pub skipped: Vec<SkippedRecord>,
}

pub(crate) fn normalize_handle(handle: &str) -> String {
    handle.trim().to_lowercase()
}

/// Read headerless `author,text[,timestamp]` rows from any reader
pub fn read_records<R: Read>(reader: R) -> Result<RecordBatch> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut batch = RecordBatch::default();

    for (row, result) in csv_reader.records().enumerate() {
        let fallback_line = row as u64 + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                let line = e.position().map_or(fallback_line, |p| p.line());
                skip(&mut batch, line, e.to_string());
                continue;
            }
        };

        let line = record.position().map_or(fallback_line, |p| p.line());

        if record.len() < 2 {
            skip(&mut batch, line, "expected author and text fields".into());
            continue;
        }

        let author = normalize_handle(&record[0]);
        if author.is_empty() {
            skip(&mut batch, line, "empty author field".into());
            continue;
        }

        let timestamp = match record.get(2).map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(ts) => Some(ts),
                Err(_) => {
                    skip(&mut batch, line, format!("unparseable timestamp '{}'", raw));
                    continue;
                }
            },
        };

        batch.records.push(TweetRecord {
            author,
            text: record[1].to_string(),
            timestamp,
        });
    }

    if !batch.skipped.is_empty() {
        log::warn!("Skipped {} malformed records", batch.skipped.len());
    }

    Ok(batch)
}

/// Load records from a CSV file on disk
pub fn load_records(path: impl AsRef<Path>) -> Result<RecordBatch> {
    let path = path.as_ref();
    log::info!("Reading records from {}", path.display());

    let file = File::open(path)?;
    let batch = read_records(file)?;

    log::info!("Loaded {} records", batch.records.len());
    Ok(batch)
}

fn skip(batch: &mut RecordBatch, line: u64, reason: String) {
    log::warn!("{}", AnalysisError::InputFormat { line, reason: reason.clone() });
    batch.skipped.push(SkippedRecord { line, reason });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_text_keeps_commas() {
        let input = "dgaff,\"Twitter is pretty fun, isn't it, @dfreelon?\"\n";
        let batch = read_records(input.as_bytes()).unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].author, "dgaff");
        assert_eq!(batch.records[0].text, "Twitter is pretty fun, isn't it, @dfreelon?");
        assert!(batch.skipped.is_empty());
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let input = "onlyauthor\n,orphan text\nAlice,hello @bob,notanumber\nBob,hi @alice,1400000000\n";
        let batch = read_records(input.as_bytes()).unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].author, "bob");
        assert_eq!(batch.records[0].timestamp, Some(1_400_000_000));

        let lines: Vec<u64> = batch.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn authors_are_normalized() {
        let batch = read_records("  DGaff ,text\n".as_bytes()).unwrap();
        assert_eq!(batch.records[0].author, "dgaff");
    }
}
