// src/ingest/worker.rs
//! Per-source fetch worker.
//!
//! Order per source: fetch (no store handle held) -> parse -> dedup against
//! the store and this run -> score -> one transaction for all inserts.
//! Every failure ends here as a logged, zero-added [`SourceOutcome`].

use chrono::Utc;
use metrics::{counter, histogram};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::alert::AlertPolicy;
use crate::ingest::error::SourceError;
use crate::ingest::feed::parse_feed;
use crate::ingest::transport::FeedTransport;
use crate::ingest::types::{SourceDescriptor, SourceOutcome};
use crate::scoring::DynScorer;
use crate::store::{NewArticle, Store};

/// Everything a worker needs, resolved once per cycle and shared read-only.
pub struct WorkerContext {
    pub store: Store,
    pub transport: Arc<dyn FeedTransport>,
    pub scorer: DynScorer,
    pub policy: AlertPolicy,
    pub max_entries: Option<usize>,
}

/// Process one source. Never fails: errors are logged with the source name
/// and reported as `failure` with zero added.
pub async fn process_source(ctx: Arc<WorkerContext>, source: SourceDescriptor) -> SourceOutcome {
    let mut outcome = SourceOutcome {
        source: source.name.clone(),
        ..SourceOutcome::default()
    };

    if let Err(e) = ingest_source(&ctx, &source, &mut outcome).await {
        let kind = e.kind();
        counter!("ingest_source_errors_total", "kind" => kind).increment(1);
        match &e {
            SourceError::Storage(_) => {
                error!(target: "ingest", source = %source.name, url = %source.url, kind, error = %e, "source batch rolled back")
            }
            _ => warn!(target: "ingest", source = %source.name, url = %source.url, kind, error = %e, "source skipped this cycle"),
        }
        outcome.added = 0;
        outcome.bubbled = 0;
        outcome.failure = Some(kind);
    }
    outcome
}

async fn ingest_source(
    ctx: &WorkerContext,
    source: &SourceDescriptor,
    outcome: &mut SourceOutcome,
) -> Result<(), SourceError> {
    let body = ctx.transport.fetch(&source.url).await?;

    let t0 = std::time::Instant::now();
    let entries = parse_feed(&body)?;
    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    let limit = ctx.max_entries.unwrap_or(usize::MAX);
    let ingested_at = Utc::now();
    let mut seen: HashSet<String> = HashSet::new();
    let mut pending: Vec<NewArticle> = Vec::new();

    for entry in entries.into_iter().take(limit) {
        let Some(link) = entry.link.clone() else {
            outcome.missing_link += 1;
            continue;
        };

        if ctx.store.article_exists(&link).await? {
            outcome.known += 1;
            continue;
        }
        if !seen.insert(link.clone()) {
            outcome.batch_duplicates += 1;
            continue;
        }

        let scored = ctx.scorer.score(&entry.scoring_text());
        let score = if scored.score.is_finite() {
            scored.score
        } else {
            warn!(target: "ingest", source = %source.name, %link, "non-finite score, storing 0");
            0.0
        };

        pending.push(NewArticle {
            title: entry.title,
            link,
            summary: entry.summary,
            source: source.name.clone(),
            published_at: entry.published,
            ingested_at,
            score,
            keywords_found: scored.reasons,
            is_bubbled: ctx.policy.is_bubbled(score),
        });
    }

    if pending.is_empty() {
        debug!(target: "ingest", source = %source.name, "nothing new");
        return Ok(());
    }

    // Dropping `batch` on any error below rolls the whole source back.
    let mut batch = ctx.store.begin_batch().await?;
    let mut bubbled = 0usize;
    for article in &pending {
        if batch.insert(article).await? && article.is_bubbled {
            bubbled += 1;
        }
    }
    debug!(target: "ingest", source = %source.name, staged = batch.inserted(), "committing batch");
    let added = batch.commit().await?;

    outcome.added = added;
    outcome.bubbled = bubbled;
    // Links inserted by a concurrent writer between the check and the insert.
    outcome.known += pending.len() - added;
    Ok(())
}
