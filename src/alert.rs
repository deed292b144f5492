// src/alert.rs
//! Alert threshold policy: one global cut-off, no hysteresis, no per-source override.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertPolicy {
    pub threshold: f64,
}

impl AlertPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// `score >= threshold`.
    pub fn is_bubbled(&self, score: f64) -> bool {
        score >= self.threshold
    }
}
