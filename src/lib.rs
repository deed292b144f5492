// src/lib.rs
// Public library surface for the service binary, the one-shot runner and integration tests.

pub mod alert;
pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod scoring;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::alert::AlertPolicy;
pub use crate::api::{router, AppState};
pub use crate::config::PipelineConfig;
pub use crate::ingest::cycle::{CycleRunner, CycleSettings, CycleSummary};
pub use crate::scoring::{DynScorer, Scored, Scorer, ScorerKind};
pub use crate::store::Store;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter; `LOG_FORMAT=json` switches to one JSON object per line.
/// Safe to call more than once (later calls are no-ops).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rss_intel_monitor=info,ingest=info,scoring=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
