// src/scoring/classifier.rs
//! Trained-classifier scoring.
//!
//! The artifact is produced by the offline trainer and consumed read-only here.
//! JSON shape:
//! ```json
//! {
//!   "format": "tfidf-multinomial-nb",
//!   "vectorizer": {
//!     "vocabulary": { "ransomware": 0, "patch": 1 },
//!     "idf": [2.1, 1.4],
//!     "lowercase": true,
//!     "stop_words": ["the", "a"],
//!     "sublinear_tf": false,
//!     "norm": "l2"
//!   },
//!   "classifier": {
//!     "classes": [0, 1],
//!     "class_log_prior": [-0.69, -0.69],
//!     "feature_log_prob": [[-1.2, -0.4], [-0.3, -1.5]]
//!   },
//!   "positive_class": 1
//! }
//! ```
//! Token pattern: runs of 2+ word characters (Unicode).

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::{Scored, Scorer, ScorerKind};

pub const ARTIFACT_FORMAT: &str = "tfidf-multinomial-nb";
/// Single synthetic reason attached to every classifier score.
pub const ML_REASON: &str = "ML Prediction";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("reading artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("decoding artifact: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid artifact: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vectorizer {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Norm,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayes {
    pub classes: Vec<i64>,
    pub class_log_prior: Vec<f64>,
    pub feature_log_prob: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub format: String,
    pub vectorizer: Vectorizer,
    pub classifier: NaiveBayes,
    /// Label of the "important" class.
    #[serde(default = "default_positive_class")]
    pub positive_class: i64,
}

fn default_positive_class() -> i64 {
    1
}

impl ClassifierModel {
    pub fn from_json(s: &str) -> Result<Self, ArtifactError> {
        let model: ClassifierModel = serde_json::from_str(s)?;
        model.validate()?;
        Ok(model)
    }

    /// Shape and finiteness checks; an artifact that passes can always score.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let invalid = |m: String| Err(ArtifactError::Invalid(m));

        if self.format != ARTIFACT_FORMAT {
            return invalid(format!("unsupported format {:?}", self.format));
        }
        let n_features = self.vectorizer.idf.len();
        if n_features == 0 {
            return invalid("empty vocabulary".into());
        }
        if let Some((term, idx)) = self
            .vectorizer
            .vocabulary
            .iter()
            .find(|(_, idx)| **idx >= n_features)
        {
            return invalid(format!("term {term:?} maps to column {idx} of {n_features}"));
        }
        if self.vectorizer.idf.iter().any(|v| !v.is_finite()) {
            return invalid("non-finite idf".into());
        }

        let nb = &self.classifier;
        let n_classes = nb.classes.len();
        if n_classes < 2 {
            return invalid(format!("need at least 2 classes, got {n_classes}"));
        }
        if nb.class_log_prior.len() != n_classes || nb.feature_log_prob.len() != n_classes {
            return invalid("class dimension mismatch".into());
        }
        if nb.class_log_prior.iter().any(|v| !v.is_finite()) {
            return invalid("non-finite class prior".into());
        }
        for row in &nb.feature_log_prob {
            if row.len() != n_features {
                return invalid(format!("feature row has {} columns, expected {n_features}", row.len()));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return invalid("non-finite feature log-probability".into());
            }
        }
        if !nb.classes.contains(&self.positive_class) {
            return invalid(format!("positive class {} not in classes", self.positive_class));
        }
        Ok(())
    }
}

fn token_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?u)\b\w\w+\b").expect("token regex"))
}

/// Probability of the positive class × 100.
#[derive(Debug, Clone)]
pub struct ClassifierScorer {
    model: ClassifierModel,
    stop_words: HashSet<String>,
    positive_idx: usize,
}

impl ClassifierScorer {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = fs::read_to_string(path)?;
        Self::from_model(ClassifierModel::from_json(&raw)?)
    }

    pub fn from_model(model: ClassifierModel) -> Result<Self, ArtifactError> {
        model.validate()?;
        let positive_idx = model
            .classifier
            .classes
            .iter()
            .position(|c| *c == model.positive_class)
            .ok_or_else(|| ArtifactError::Invalid("positive class missing".into()))?;
        let stop_words = model.vectorizer.stop_words.iter().cloned().collect();
        Ok(Self {
            model,
            stop_words,
            positive_idx,
        })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.model.vectorizer.vocabulary.len()
    }

    /// TF-IDF features as sparse (column, value) pairs.
    fn features(&self, text: &str) -> Vec<(usize, f64)> {
        let v = &self.model.vectorizer;
        let text = if v.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for m in token_re().find_iter(&text) {
            let tok = m.as_str();
            if self.stop_words.contains(tok) {
                continue;
            }
            if let Some(&col) = v.vocabulary.get(tok) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let mut feats: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = if v.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (col, tf * v.idf[col])
            })
            .collect();

        if v.norm == Norm::L2 {
            let norm = feats.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, x) in feats.iter_mut() {
                    *x /= norm;
                }
            }
        }
        feats
    }

    /// Posterior probability of the positive class.
    pub fn predict_proba(&self, text: &str) -> f64 {
        let nb = &self.model.classifier;
        let feats = self.features(text);

        let jll: Vec<f64> = nb
            .class_log_prior
            .iter()
            .zip(&nb.feature_log_prob)
            .map(|(prior, row)| prior + feats.iter().map(|(col, x)| x * row[*col]).sum::<f64>())
            .collect();

        // log-sum-exp
        let max = jll.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let lse = max + jll.iter().map(|j| (j - max).exp()).sum::<f64>().ln();
        let p = (jll[self.positive_idx] - lse).exp();
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Scorer for ClassifierScorer {
    fn score(&self, text: &str) -> Scored {
        Scored {
            score: self.predict_proba(text) * 100.0,
            reasons: vec![ML_REASON.to_string()],
        }
    }

    fn kind(&self) -> ScorerKind {
        ScorerKind::Classifier
    }
}
