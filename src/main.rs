//! RSS intel monitor: service entrypoint.
//! Boots the store, the periodic fetcher and the Axum trigger/review API.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};

use rss_intel_monitor::api::{router, AppState};
use rss_intel_monitor::config::PipelineConfig;
use rss_intel_monitor::ingest::cycle::{CycleRunner, CycleSettings};
use rss_intel_monitor::ingest::scheduler::spawn_scheduler;
use rss_intel_monitor::ingest::transport::HttpTransport;
use rss_intel_monitor::metrics::Metrics;
use rss_intel_monitor::store::Store;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    rss_intel_monitor::init_tracing();

    let cfg = PipelineConfig::load().context("loading pipeline config")?;
    info!(
        target: "rss_intel_monitor",
        threshold = cfg.alert_threshold,
        max_workers = cfg.max_workers,
        interval_secs = cfg.fetch_interval_secs,
        "pipeline config loaded"
    );

    let store = Store::connect(&cfg.database_url, cfg.pool_size()).await?;
    store.seed_defaults().await.context("seeding defaults")?;

    let transport = Arc::new(HttpTransport::from_config(&cfg)?);
    let runner = Arc::new(CycleRunner::new(
        store,
        transport,
        CycleSettings::from(&cfg),
    ));

    // Lives for the whole process; Shuttle owns shutdown.
    let _scheduler = spawn_scheduler(Arc::clone(&runner), cfg.fetch_interval());

    let metrics = match Metrics::init(&cfg) {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(target: "rss_intel_monitor", error = ?e, "metrics disabled");
            None
        }
    };

    let app = router(AppState { runner }, metrics.as_ref());
    Ok(app.into())
}
