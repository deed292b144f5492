// src/store/admin.rs
//! Keyword/source administration, default seeding and purge.

use super::{FeedSource, Store, StoreResult};
use tracing::info;

/// Weight used when a bulk keyword line has no (valid) weight.
pub const DEFAULT_KEYWORD_WEIGHT: i64 = 10;
/// Name used when a bulk source line has no name.
pub const DEFAULT_SOURCE_NAME: &str = "New Feed";

pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
    ("https://feeds.feedburner.com/TheHackersNews", "Hacker News"),
    ("https://www.bleepingcomputer.com/feed/", "BleepingComputer"),
];

pub const DEFAULT_KEYWORDS: &[(&str, i64)] = &[("critical", 50), ("rce", 60), ("vulnerability", 40)];

/// Added/skipped tallies of a bulk operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BulkOutcome {
    pub added: usize,
    pub skipped: usize,
}

/// `"zero-day, 80"` -> `("zero-day", 80)`; a missing or unparsable weight
/// falls back to [`DEFAULT_KEYWORD_WEIGHT`]. Blank lines yield `None`.
pub fn parse_keyword_line(line: &str) -> Option<(String, i64)> {
    let mut parts = line.split(',');
    let word = normalize_keyword(parts.next()?);
    if word.is_empty() {
        return None;
    }
    let weight = parts
        .next()
        .and_then(|w| w.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_KEYWORD_WEIGHT);
    Some((word, weight))
}

/// `"https://site/feed, Security Weekly"` -> `(url, name)`.
pub fn parse_source_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.split(',');
    let url = parts.next()?.trim().to_string();
    if url.is_empty() {
        return None;
    }
    let name = parts
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_SOURCE_NAME)
        .to_string();
    Some((url, name))
}

pub fn normalize_keyword(word: &str) -> String {
    word.trim().to_lowercase()
}

impl Store {
    /// Insert the default sources/keywords into tables that are still empty.
    pub async fn seed_defaults(&self) -> StoreResult<()> {
        let sources: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feed_sources")
            .fetch_one(self.pool())
            .await?;
        if sources == 0 {
            for (url, name) in DEFAULT_SOURCES {
                self.add_source(url, name).await?;
            }
            info!(target: "store", count = DEFAULT_SOURCES.len(), "seeded default sources");
        }

        let keywords: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keywords")
            .fetch_one(self.pool())
            .await?;
        if keywords == 0 {
            for (word, weight) in DEFAULT_KEYWORDS {
                self.add_keyword(word, *weight).await?;
            }
            info!(target: "store", count = DEFAULT_KEYWORDS.len(), "seeded default keywords");
        }
        Ok(())
    }

    // ---------------- keywords ----------------

    /// Returns false when the (normalized) word already exists or is empty.
    pub async fn add_keyword(&self, word: &str, weight: i64) -> StoreResult<bool> {
        let word = normalize_keyword(word);
        if word.is_empty() {
            return Ok(false);
        }
        let res = sqlx::query("INSERT INTO keywords (word, weight) VALUES (?, ?) ON CONFLICT(word) DO NOTHING")
            .bind(&word)
            .bind(weight)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// One `word, weight` per line.
    pub async fn add_keywords_bulk(&self, text: &str) -> StoreResult<BulkOutcome> {
        let mut out = BulkOutcome::default();
        for (word, weight) in text.lines().filter_map(parse_keyword_line) {
            if self.add_keyword(&word, weight).await? {
                out.added += 1;
            } else {
                out.skipped += 1;
            }
        }
        Ok(out)
    }

    pub async fn delete_keyword(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM keywords WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // ---------------- sources ----------------

    /// New sources start active. Returns false for a duplicate URL.
    pub async fn add_source(&self, url: &str, name: &str) -> StoreResult<bool> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(false);
        }
        let res = sqlx::query(
            "INSERT INTO feed_sources (url, name, is_active) VALUES (?, ?, 1) ON CONFLICT(url) DO NOTHING",
        )
        .bind(url)
        .bind(name.trim())
        .execute(self.pool())
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// One `url, name` per line.
    pub async fn add_sources_bulk(&self, text: &str) -> StoreResult<BulkOutcome> {
        let mut out = BulkOutcome::default();
        for (url, name) in text.lines().filter_map(parse_source_line) {
            if self.add_source(&url, &name).await? {
                out.added += 1;
            } else {
                out.skipped += 1;
            }
        }
        Ok(out)
    }

    pub async fn set_source_active(&self, id: i64, active: bool) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE feed_sources SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_source(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM feed_sources WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Every source, active or not.
    pub async fn sources(&self) -> StoreResult<Vec<FeedSource>> {
        sqlx::query_as::<_, FeedSource>("SELECT id, url, name, is_active FROM feed_sources ORDER BY id")
            .fetch_all(self.pool())
            .await
    }

    // ---------------- purge ----------------

    /// Delete every article, keeping sources and keywords. Safe on an empty table.
    pub async fn purge_articles(&self) -> StoreResult<u64> {
        let res = sqlx::query("DELETE FROM articles").execute(self.pool()).await?;
        info!(target: "store", deleted = res.rows_affected(), "articles purged");
        Ok(res.rows_affected())
    }

    /// Wipe articles, sources and keywords in one transaction.
    pub async fn factory_reset(&self) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM articles").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM feed_sources").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM keywords").execute(&mut *tx).await?;
        tx.commit().await?;
        info!(target: "store", "factory reset");
        Ok(())
    }
}
