// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::cycle::CycleRunner;

pub const BOOT_TRIGGER: &str = "Worker Boot";
pub const SCHEDULED_TRIGGER: &str = "Scheduled";
pub const MANUAL_TRIGGER: &str = "User Force";

/// Spawn the periodic fetcher: one cycle immediately, then one per `period`.
/// A cycle that overruns the period delays the next tick instead of bursting.
pub fn spawn_scheduler(runner: Arc<CycleRunner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(target: "ingest", period_secs = period.as_secs(), "scheduler started");

        let mut trigger = BOOT_TRIGGER;
        loop {
            ticker.tick().await;
            let _ = runner.run_cycle(trigger).await;
            trigger = SCHEDULED_TRIGGER;
        }
    })
}
