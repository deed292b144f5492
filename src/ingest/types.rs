// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of one active source, detached from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// One parsed feed item, before dedup and scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// Dedup key. `None` (or blank) entries are skipped by the worker.
    pub link: Option<String>,
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Text handed to the scoring strategy.
    pub fn scoring_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

/// What one source worker reports back to the orchestrator.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source: String,
    pub added: usize,
    pub bubbled: usize,
    /// Entries already stored by an earlier cycle.
    pub known: usize,
    /// Entries repeated within the same document.
    pub batch_duplicates: usize,
    pub missing_link: usize,
    /// Failure class (`timeout`, `http_status`, ...) when the source failed.
    pub failure: Option<&'static str>,
}
