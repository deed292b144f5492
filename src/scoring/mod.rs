// src/scoring/mod.rs
//! Scoring strategies: keyword-weight sum or trained classifier.
//!
//! A cycle resolves exactly one strategy up front and hands the same
//! `Arc<dyn Scorer>` to every worker, so all articles of a cycle are scored
//! consistently even if the artifact is replaced mid-cycle.

pub mod classifier;
pub mod keyword;

use std::path::Path;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{info, warn};

use crate::store::{Store, StoreResult};

pub use classifier::{ArtifactError, ClassifierModel, ClassifierScorer, ML_REASON};
pub use keyword::KeywordScorer;

/// Output of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scored {
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Which implementation produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Keyword,
    Classifier,
}

impl ScorerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScorerKind::Keyword => "keyword",
            ScorerKind::Classifier => "classifier",
        }
    }
}

/// Stateless, read-only scoring shared across concurrent workers.
pub trait Scorer: Send + Sync {
    fn score(&self, text: &str) -> Scored;
    fn kind(&self) -> ScorerKind;
}

pub type DynScorer = Arc<dyn Scorer>;

/// Pick the strategy for one cycle: the trained artifact when it exists and
/// loads cleanly, the keyword table otherwise. A broken artifact is logged and
/// never fails the cycle.
pub async fn resolve_scorer(store: &Store, model_path: &Path) -> StoreResult<DynScorer> {
    if model_path.exists() {
        match ClassifierScorer::load(model_path) {
            Ok(s) => {
                info!(target: "scoring", path = %model_path.display(), vocab = s.vocabulary_len(), "using trained classifier");
                return Ok(Arc::new(s));
            }
            Err(e) => {
                warn!(target: "scoring", path = %model_path.display(), error = %e, "classifier artifact unusable, falling back to keywords");
                counter!("scoring_fallback_total").increment(1);
            }
        }
    }

    let keywords = store.keywords().await?;
    let scorer = KeywordScorer::new(keywords.into_iter().map(|k| (k.word, k.weight)));
    info!(target: "scoring", keywords = scorer.len(), "using keyword scorer");
    Ok(Arc::new(scorer))
}
