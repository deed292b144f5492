//! One-shot runner: execute a single cycle against the configured store and
//! print the summary as JSON on stdout.
//!
//! Run: `cargo run --bin run_cycle`

use std::sync::Arc;

use anyhow::{Context, Result};

use rss_intel_monitor::config::PipelineConfig;
use rss_intel_monitor::ingest::cycle::{CycleRunner, CycleSettings};
use rss_intel_monitor::ingest::scheduler::MANUAL_TRIGGER;
use rss_intel_monitor::ingest::transport::HttpTransport;
use rss_intel_monitor::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    rss_intel_monitor::init_tracing();

    let cfg = PipelineConfig::load().context("loading pipeline config")?;
    let store = Store::connect(&cfg.database_url, cfg.pool_size()).await?;
    store.seed_defaults().await.context("seeding defaults")?;

    let transport = Arc::new(HttpTransport::from_config(&cfg)?);
    let runner = CycleRunner::new(store.clone(), transport, CycleSettings::from(&cfg));

    let summary = runner.run_cycle(MANUAL_TRIGGER).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    store.close().await;
    Ok(())
}
