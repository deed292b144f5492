// src/scoring/keyword.rs
use super::{Scored, Scorer, ScorerKind};

/// Sum of weights of every keyword contained (as a substring) in the
/// lower-cased text. Matching is substring-based, not token-based:
/// "ransomware" matches inside "ransomware-as-a-service", "scar" inside "oscar".
#[derive(Debug, Clone, Default)]
pub struct KeywordScorer {
    // (word, weight), in match-report order
    keywords: Vec<(String, i64)>,
}

impl KeywordScorer {
    /// Words are lower-cased and trimmed; empty words and repeated words are
    /// dropped (first occurrence wins). Order is preserved, so pass the table
    /// in the order reasons should be reported (the store yields weight desc,
    /// then word asc).
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut out: Vec<(String, i64)> = Vec::new();
        for (w, weight) in keywords {
            let w = w.as_ref().trim().to_lowercase();
            if w.is_empty() || out.iter().any(|(seen, _)| *seen == w) {
                continue;
            }
            out.push((w, weight));
        }
        Self { keywords: out }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl Scorer for KeywordScorer {
    fn score(&self, text: &str) -> Scored {
        let lower = text.to_lowercase();
        let mut total: i64 = 0;
        let mut reasons = Vec::new();
        for (word, weight) in &self.keywords {
            if lower.contains(word.as_str()) {
                total = total.saturating_add(*weight);
                reasons.push(word.clone());
            }
        }
        Scored {
            score: total as f64,
            reasons,
        }
    }

    fn kind(&self) -> ScorerKind {
        ScorerKind::Keyword
    }
}
