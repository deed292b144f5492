// src/store/mod.rs
//! SQLite-backed article/source/keyword store.
//!
//! The store is the only shared mutable resource of the pipeline. Every caller
//! borrows its own pooled connection per statement or per transaction; nothing
//! here holds a connection across an `.await` on network I/O.

pub mod admin;
pub mod types;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub use types::{
    Article, FeedSource, FeedbackCounts, HumanFeedback, Keyword, LabeledSample, NewArticle,
};

use types::ArticleRow;

pub type StoreResult<T> = std::result::Result<T, sqlx::Error>;

/// Minimum number of labelled samples the offline trainer needs.
pub const MIN_TRAINING_SAMPLES: usize = 10;

const ARTICLE_COLUMNS: &str = "id, title, link, summary, source, published_at, ingested_at, \
     score, keywords_found, is_bubbled, human_feedback";

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database behind `url` and apply the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let file = opts.get_filename();
        if let Some(parent) = file.parent() {
            if !parent.as_os_str().is_empty() && file != std::path::Path::new(":memory:") {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating database directory {}", parent.display()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(opts)
            .await
            .with_context(|| format!("connecting to {url}"))?;

        let store = Self { pool };
        store.migrate().await.context("applying schema")?;
        info!(target: "store", url, max_connections, "store ready");
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection. Later calls fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_sources (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keywords (
                id INTEGER PRIMARY KEY,
                word TEXT NOT NULL UNIQUE,
                weight INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                summary TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL,
                published_at TEXT,
                ingested_at TEXT NOT NULL,
                score REAL NOT NULL DEFAULT 0,
                keywords_found TEXT NOT NULL DEFAULT '[]',
                is_bubbled INTEGER NOT NULL DEFAULT 0,
                human_feedback INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_inbox ON articles(is_bubbled, human_feedback, score DESC)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_ingested ON articles(ingested_at DESC)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Pipeline reads/writes
    // ------------------------------------------------------------------

    /// Active sources ordered by id, read with one statement.
    pub async fn active_sources(&self) -> StoreResult<Vec<FeedSource>> {
        sqlx::query_as::<_, FeedSource>(
            "SELECT id, url, name, is_active FROM feed_sources WHERE is_active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Full keyword table in scoring order: heaviest first, ties by word.
    pub async fn keywords(&self) -> StoreResult<Vec<Keyword>> {
        sqlx::query_as::<_, Keyword>(
            "SELECT id, word, weight FROM keywords ORDER BY weight DESC, word ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Historical dedup check.
    pub async fn article_exists(&self, link: &str) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM articles WHERE link = ?)")
            .bind(link)
            .fetch_one(&self.pool)
            .await
    }

    /// Start a per-source unit of work. Dropping the batch without `commit`
    /// rolls every insert back.
    pub async fn begin_batch(&self) -> StoreResult<ArticleBatch> {
        let tx = self.pool.begin().await?;
        Ok(ArticleBatch { tx, inserted: 0 })
    }

    // ------------------------------------------------------------------
    // Review surface
    // ------------------------------------------------------------------

    pub async fn article_by_link(&self, link: &str) -> StoreResult<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE link = ?");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(link)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Article::from))
    }

    pub async fn article_by_id(&self, id: i64) -> StoreResult<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Article::from))
    }

    pub async fn count_articles(&self) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
    }

    /// Bubbled and not yet reviewed, highest score first.
    pub async fn inbox(&self, limit: i64) -> StoreResult<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE is_bubbled = 1 AND human_feedback = 0 \
             ORDER BY score DESC, id ASC LIMIT ?"
        );
        self.fetch_articles(&sql, &[limit]).await
    }

    /// Confirmed articles, newest first.
    pub async fn confirmed(&self, limit: i64) -> StoreResult<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE human_feedback = 2 \
             ORDER BY ingested_at DESC, id DESC LIMIT ?"
        );
        self.fetch_articles(&sql, &[limit]).await
    }

    /// Every article, newest first; `page` is 1-based.
    pub async fn archive(&self, page: i64, per_page: i64) -> StoreResult<Vec<Article>> {
        let per_page = per_page.max(1);
        let offset = (page.max(1) - 1) * per_page;
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             ORDER BY ingested_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        self.fetch_articles(&sql, &[per_page, offset]).await
    }

    async fn fetch_articles(&self, sql: &str, binds: &[i64]) -> StoreResult<Vec<Article>> {
        let mut q = sqlx::query_as::<_, ArticleRow>(sql);
        for b in binds {
            q = q.bind(*b);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Record a review decision. `bubbled` overrides the ingestion-time flag
    /// (promotion from the archive). Returns false when the id is unknown.
    pub async fn set_feedback(
        &self,
        id: i64,
        feedback: HumanFeedback,
        bubbled: Option<bool>,
    ) -> StoreResult<bool> {
        let res = match bubbled {
            Some(b) => {
                sqlx::query("UPDATE articles SET human_feedback = ?, is_bubbled = ? WHERE id = ?")
                    .bind(feedback.as_i64())
                    .bind(b)
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("UPDATE articles SET human_feedback = ? WHERE id = ?")
                    .bind(feedback.as_i64())
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(res.rows_affected() > 0)
    }

    pub async fn feedback_counts(&self) -> StoreResult<FeedbackCounts> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT human_feedback, COUNT(*) FROM articles GROUP BY human_feedback",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = FeedbackCounts::default();
        for (code, n) in rows {
            match HumanFeedback::from_i64(code) {
                HumanFeedback::Unreviewed => counts.unreviewed += n,
                HumanFeedback::Dismissed => counts.dismissed += n,
                HumanFeedback::Confirmed => counts.confirmed += n,
            }
        }
        Ok(counts)
    }

    /// Whether enough articles have been reviewed to train a classifier.
    pub async fn ready_for_training(&self) -> StoreResult<bool> {
        let counts = self.feedback_counts().await?;
        Ok((counts.dismissed + counts.confirmed) as usize >= MIN_TRAINING_SAMPLES)
    }

    /// Trainer input: reviewed articles only, dismissed -> 0, confirmed -> 1.
    pub async fn labeled_samples(&self) -> StoreResult<Vec<LabeledSample>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT title, summary, human_feedback FROM articles \
             WHERE human_feedback IN (1, 2) ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(title, summary, fb)| LabeledSample {
                title,
                summary,
                label: u8::from(fb == 2),
            })
            .collect())
    }
}

/// One source's pending inserts, committed (or rolled back) as a unit.
pub struct ArticleBatch {
    tx: Transaction<'static, Sqlite>,
    inserted: usize,
}

impl ArticleBatch {
    /// Insert unless the link already exists. A duplicate is a silent skip
    /// and returns `false`; the existing row is never overwritten.
    pub async fn insert(&mut self, a: &NewArticle) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO articles
                (title, link, summary, source, published_at, ingested_at,
                 score, keywords_found, is_bubbled, human_feedback)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(link) DO NOTHING
            "#,
        )
        .bind(&a.title)
        .bind(&a.link)
        .bind(&a.summary)
        .bind(&a.source)
        .bind(a.published_at)
        .bind(a.ingested_at)
        .bind(a.score)
        .bind(Json(a.keywords_found.clone()))
        .bind(a.is_bubbled)
        .execute(&mut *self.tx)
        .await?;

        let inserted = res.rows_affected() > 0;
        if inserted {
            self.inserted += 1;
        }
        Ok(inserted)
    }

    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Commit and return the number of rows actually inserted.
    pub async fn commit(self) -> StoreResult<usize> {
        let n = self.inserted;
        self.tx.commit().await?;
        Ok(n)
    }

    pub async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await
    }
}
