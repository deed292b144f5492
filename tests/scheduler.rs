// tests/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

mod common;

use common::{rss, FakeResponse, FakeTransport, TestEnv};
use rss_intel_monitor::ingest::scheduler::spawn_scheduler;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduler_runs_immediately_then_periodically() {
    let env = TestEnv::new().await;
    env.add_source("A", "https://a.test/rss").await;
    let transport = Arc::new(FakeTransport::new().serve(
        "https://a.test/rss",
        FakeResponse::Body(rss(&[("a", "https://a.test/1", "")])),
    ));
    let runner = Arc::new(env.runner(Arc::clone(&transport), 50.0, 2));

    let handle = spawn_scheduler(Arc::clone(&runner), Duration::from_millis(50));

    let waited = tokio::time::timeout(Duration::from_secs(10), async {
        while runner.cycles_completed() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    handle.abort();

    assert!(waited.is_ok(), "scheduler did not tick 3 times");
    assert!(transport.calls() >= 3);
    // Later cycles found the link already stored.
    assert_eq!(env.store.count_articles().await.unwrap(), 1);
}
