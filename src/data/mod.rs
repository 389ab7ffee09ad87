//! Raw record ingestion and edge extraction

pub mod extract;
pub mod records;

pub use extract::{extract_edges, Edge, ExtractMode, Extraction, InteractionKind};
pub use records::{load_records, read_records, RecordBatch, SkippedRecord, TweetRecord};
