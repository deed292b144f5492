// src/ingest/cycle.rs
//! Cycle orchestrator: snapshot -> resolve strategy -> bounded fan-out -> fan-in.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::alert::AlertPolicy;
use crate::config::PipelineConfig;
use crate::ingest::registry;
use crate::ingest::transport::FeedTransport;
use crate::ingest::worker::{process_source, WorkerContext};
use crate::ingest::ensure_metrics_described;
use crate::scoring::{resolve_scorer, DynScorer, ScorerKind};
use crate::store::Store;

/// Result of one cycle, logged and returned to the trigger.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CycleSummary {
    pub trigger: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub sources: usize,
    pub total_added: usize,
    pub total_bubbled: usize,
    pub failed_sources: usize,
    pub crashed_sources: usize,
    pub scorer: Option<ScorerKind>,
}

impl CycleSummary {
    fn empty(trigger: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            trigger: trigger.to_string(),
            started_at,
            duration_ms: 0,
            sources: 0,
            total_added: 0,
            total_bubbled: 0,
            failed_sources: 0,
            crashed_sources: 0,
            scorer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub alert_threshold: f64,
    pub max_workers: usize,
    pub model_path: PathBuf,
    pub max_entries_per_source: Option<usize>,
}

impl From<&PipelineConfig> for CycleSettings {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            alert_threshold: cfg.alert_threshold,
            max_workers: cfg.max_workers.max(1),
            model_path: cfg.model_path.clone(),
            max_entries_per_source: cfg.max_entries_per_source,
        }
    }
}

/// Runs cycles on demand. Cycles are serialised: a manual trigger that
/// arrives while the timer's cycle is running waits for it to finish.
///
/// Each cycle runs on its own task. Dropping the caller's future never
/// truncates a cycle.
pub struct CycleRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    store: Store,
    transport: Arc<dyn FeedTransport>,
    settings: CycleSettings,
    running: Mutex<()>,
    completed: AtomicU64,
}

impl CycleRunner {
    pub fn new(store: Store, transport: Arc<dyn FeedTransport>, settings: CycleSettings) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                store,
                transport,
                settings: CycleSettings {
                    max_workers: settings.max_workers.max(1),
                    ..settings
                },
                running: Mutex::new(()),
                completed: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.inner.settings
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Number of cycles finished since start.
    pub fn cycles_completed(&self) -> u64 {
        self.inner.completed.load(Ordering::Relaxed)
    }

    /// Run one full cycle, resolving the scoring strategy from the store and
    /// the artifact path. Never fails; problems are logged and reflected in
    /// the summary.
    pub async fn run_cycle(&self, trigger: &str) -> CycleSummary {
        self.spawn_and_wait(trigger, None).await
    }

    /// Same as [`run_cycle`](Self::run_cycle) with a caller-supplied strategy.
    pub async fn run_cycle_with_scorer(&self, trigger: &str, scorer: DynScorer) -> CycleSummary {
        self.spawn_and_wait(trigger, Some(scorer)).await
    }

    async fn spawn_and_wait(&self, trigger: &str, scorer: Option<DynScorer>) -> CycleSummary {
        let inner = Arc::clone(&self.inner);
        let label = trigger.to_string();
        let handle = tokio::spawn(async move { inner.run(&label, scorer).await });
        match handle.await {
            Ok(summary) => summary,
            Err(e) => {
                error!(target: "ingest", trigger, error = %e, "cycle task failed");
                CycleSummary::empty(trigger, Utc::now())
            }
        }
    }
}

impl RunnerInner {
    async fn run(&self, trigger: &str, scorer: Option<DynScorer>) -> CycleSummary {
        ensure_metrics_described();
        let _guard = self.running.lock().await;

        let started_at = Utc::now();
        let t0 = Instant::now();
        info!(target: "ingest", trigger, "starting feed fetch cycle");

        let summary = self.run_locked(trigger, scorer, started_at).await;
        let summary = CycleSummary {
            duration_ms: t0.elapsed().as_millis() as u64,
            ..summary
        };

        self.completed.fetch_add(1, Ordering::Relaxed);
        counter!("ingest_cycles_total").increment(1);
        counter!("ingest_articles_added_total").increment(summary.total_added as u64);
        counter!("ingest_articles_bubbled_total").increment(summary.total_bubbled as u64);
        histogram!("ingest_cycle_duration_ms").record(summary.duration_ms as f64);
        gauge!("ingest_last_cycle_ts").set(Utc::now().timestamp() as f64);

        info!(
            target: "ingest",
            trigger,
            sources = summary.sources,
            total_added = summary.total_added,
            bubbled = summary.total_bubbled,
            failed = summary.failed_sources,
            crashed = summary.crashed_sources,
            scorer = summary.scorer.map(ScorerKind::as_str).unwrap_or("none"),
            duration_ms = summary.duration_ms,
            "cycle complete"
        );
        summary
    }

    async fn run_locked(
        &self,
        trigger: &str,
        scorer: Option<DynScorer>,
        started_at: DateTime<Utc>,
    ) -> CycleSummary {
        let mut summary = CycleSummary::empty(trigger, started_at);

        let sources = match registry::snapshot(&self.store).await {
            Ok(s) => s,
            Err(e) => {
                error!(target: "ingest", trigger, error = %e, "source snapshot failed");
                return summary;
            }
        };
        if sources.is_empty() {
            warn!(target: "ingest", trigger, "no active feeds");
            return summary;
        }
        summary.sources = sources.len();

        let scorer = match scorer {
            Some(s) => s,
            None => match resolve_scorer(&self.store, &self.settings.model_path).await {
                Ok(s) => s,
                Err(e) => {
                    error!(target: "ingest", trigger, error = %e, "could not load scoring strategy");
                    return summary;
                }
            },
        };
        summary.scorer = Some(scorer.kind());

        let ctx = Arc::new(WorkerContext {
            store: self.store.clone(),
            transport: Arc::clone(&self.transport),
            scorer,
            policy: AlertPolicy::new(self.settings.alert_threshold),
            max_entries: self.settings.max_entries_per_source,
        });

        // Tasks are spawned lazily as the buffer pulls them, so at most
        // `max_workers` are in flight; a panic surfaces as a JoinError here.
        let mut completions = stream::iter(sources)
            .map(|source| {
                let ctx = Arc::clone(&ctx);
                async move {
                    let name = source.name.clone();
                    (name, tokio::spawn(process_source(ctx, source)).await)
                }
            })
            .buffer_unordered(self.settings.max_workers);

        while let Some((name, joined)) = completions.next().await {
            match joined {
                Ok(outcome) => {
                    info!(
                        target: "ingest",
                        source = %name,
                        added = outcome.added,
                        bubbled = outcome.bubbled,
                        known = outcome.known,
                        batch_duplicates = outcome.batch_duplicates,
                        missing_link = outcome.missing_link,
                        failure = outcome.failure.unwrap_or("none"),
                        "source complete"
                    );
                    summary.total_added += outcome.added;
                    summary.total_bubbled += outcome.bubbled;
                    if outcome.failure.is_some() {
                        summary.failed_sources += 1;
                    }
                }
                Err(e) => {
                    counter!("ingest_worker_panics_total").increment(1);
                    error!(target: "ingest", source = %name, error = %e, "worker crashed");
                    summary.crashed_sources += 1;
                }
            }
        }

        summary
    }
}
