// src/ingest/mod.rs
pub mod cycle;
pub mod error;
pub mod feed;
pub mod registry;
pub mod scheduler;
pub mod transport;
pub mod types;
pub mod worker;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use cycle::{CycleRunner, CycleSummary};
pub use types::{FeedEntry, SourceDescriptor, SourceOutcome};

/// Longest summary kept per article (chars).
pub const MAX_SUMMARY_CHARS: usize = 5000;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_cycles_total", "Completed fetch cycles.");
        describe_counter!(
            "ingest_articles_added_total",
            "Articles inserted across all sources."
        );
        describe_counter!(
            "ingest_articles_bubbled_total",
            "Inserted articles at or above the alert threshold."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Source-level failures by kind (timeout, http_status, network, parse, storage)."
        );
        describe_counter!(
            "ingest_worker_panics_total",
            "Source workers that crashed and were caught at fan-in."
        );
        describe_counter!(
            "scoring_fallback_total",
            "Cycles that fell back to keyword scoring because the artifact was unusable."
        );
        describe_histogram!("ingest_cycle_duration_ms", "Cycle wall time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("ingest_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

/// Decode entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_SUMMARY_CHARS {
        out = out.chars().take(MAX_SUMMARY_CHARS).collect();
    }

    out
}
