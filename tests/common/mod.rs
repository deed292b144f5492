// tests/common/mod.rs
//
// Shared helpers for integration tests: a temp SQLite store, an instrumented
// in-memory transport and small feed builders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use rss_intel_monitor::ingest::cycle::{CycleRunner, CycleSettings};
use rss_intel_monitor::ingest::error::FetchError;
use rss_intel_monitor::ingest::transport::FeedTransport;
use rss_intel_monitor::store::{NewArticle, Store};

/// Temp directory that owns the database file; keep it alive for the test.
pub struct TestEnv {
    pub dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("intel.db").display());
        let store = Store::connect(&url, 8).await.expect("connect temp store");
        Self { dir, store }
    }

    /// Path that does not exist unless the test writes it.
    pub fn model_path(&self) -> PathBuf {
        self.dir.path().join("model.json")
    }

    pub fn settings(&self, threshold: f64, max_workers: usize) -> CycleSettings {
        CycleSettings {
            alert_threshold: threshold,
            max_workers,
            model_path: self.model_path(),
            max_entries_per_source: None,
        }
    }

    pub fn runner(&self, transport: Arc<FakeTransport>, threshold: f64, max_workers: usize) -> CycleRunner {
        CycleRunner::new(
            self.store.clone(),
            transport,
            self.settings(threshold, max_workers),
        )
    }

    pub async fn add_source(&self, name: &str, url: &str) {
        assert!(self.store.add_source(url, name).await.expect("add source"));
    }

    /// Pre-existing article, as if stored by an earlier cycle.
    pub async fn insert_existing(&self, link: &str) {
        let mut batch = self.store.begin_batch().await.expect("begin");
        batch
            .insert(&NewArticle {
                title: "Old".into(),
                link: link.into(),
                summary: String::new(),
                source: "seed".into(),
                published_at: None,
                ingested_at: chrono::Utc::now(),
                score: 0.0,
                keywords_found: vec![],
                is_bubbled: false,
            })
            .await
            .expect("insert");
        batch.commit().await.expect("commit");
    }
}

#[derive(Clone, Debug)]
pub enum FakeResponse {
    Body(String),
    Status(u16),
    Timeout,
    Panic,
}

/// Serves canned responses per URL and records the concurrent-call high-water mark.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, FakeResponse>>,
    delay: Duration,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn serve(self, url: &str, resp: FakeResponse) -> Self {
        self.set(url, resp);
        self
    }

    pub fn set(&self, url: &str, resp: FakeResponse) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(url.to_string(), resp);
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedTransport for FakeTransport {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);

        let resp = self
            .responses
            .lock()
            .expect("responses lock")
            .get(url)
            .cloned();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match resp {
            Some(FakeResponse::Body(b)) => Ok(b),
            Some(FakeResponse::Status(s)) => Err(FetchError::Status { status: s }),
            Some(FakeResponse::Timeout) => Err(FetchError::Timeout("operation timed out".into())),
            Some(FakeResponse::Panic) => panic!("transport blew up for {url}"),
            None => Err(FetchError::Status { status: 404 }),
        }
    }
}

/// Minimal RSS 2.0 document; items are (title, link, description).
pub fn rss(items: &[(&str, &str, &str)]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Test</title><link>https://feed.test/</link>"#,
    );
    for (title, link, desc) in items {
        out.push_str(&format!(
            "<item><title>{title}</title><link>{link}</link><description>{desc}</description>\
             <pubDate>Mon, 09 Jun 2025 08:30:00 GMT</pubDate></item>"
        ));
    }
    out.push_str("</channel></rss>");
    out
}

/// Same tiny two-term artifact used across scoring tests.
pub const TINY_MODEL_JSON: &str = r#"{
  "format": "tfidf-multinomial-nb",
  "vectorizer": {
    "vocabulary": {"exploit": 0, "recipe": 1},
    "idf": [1.0, 1.0]
  },
  "classifier": {
    "classes": [0, 1],
    "class_log_prior": [-0.6931471805599453, -0.6931471805599453],
    "feature_log_prob": [[-3.0, -0.05], [-0.05, -3.0]]
  }
}"#;
