// src/store/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Review state of an article. Stored as 0/1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HumanFeedback {
    #[default]
    Unreviewed,
    Dismissed,
    Confirmed,
}

impl HumanFeedback {
    pub fn as_i64(self) -> i64 {
        match self {
            HumanFeedback::Unreviewed => 0,
            HumanFeedback::Dismissed => 1,
            HumanFeedback::Confirmed => 2,
        }
    }

    /// Unknown codes read back as `Unreviewed`.
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => HumanFeedback::Dismissed,
            2 => HumanFeedback::Confirmed,
            _ => HumanFeedback::Unreviewed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String,
    /// Entry date from the feed, when the feed carried a parsable one.
    pub published_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
    pub score: f64,
    pub keywords_found: Vec<String>,
    pub is_bubbled: bool,
    pub human_feedback: HumanFeedback,
}

/// Insert payload built by a source worker.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
    pub score: f64,
    pub keywords_found: Vec<String>,
    pub is_bubbled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedSource {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Keyword {
    pub id: i64,
    pub word: String,
    pub weight: i64,
}

/// One human-labelled sample handed to the offline classifier trainer.
/// `label` is 0 for dismissed, 1 for confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabeledSample {
    pub title: String,
    pub summary: String,
    pub label: u8,
}

impl LabeledSample {
    /// Trainer input text: title and summary joined the same way the pipeline scores them.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackCounts {
    pub unreviewed: i64,
    pub dismissed: i64,
    pub confirmed: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
    pub score: f64,
    pub keywords_found: Json<Vec<String>>,
    pub is_bubbled: bool,
    pub human_feedback: i64,
}

impl From<ArticleRow> for Article {
    fn from(r: ArticleRow) -> Self {
        Article {
            id: r.id,
            title: r.title,
            link: r.link,
            summary: r.summary,
            source: r.source,
            published_at: r.published_at,
            ingested_at: r.ingested_at,
            score: r.score,
            keywords_found: r.keywords_found.0,
            is_bubbled: r.is_bubbled,
            human_feedback: HumanFeedback::from_i64(r.human_feedback),
        }
    }
}
