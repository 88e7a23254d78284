//! Telemetry record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One assembled conversation turn, as appended to `turns.jsonl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    /// Topic keys answered from a stored summary
    #[serde(default)]
    pub summary_hits: Vec<String>,
    /// Topic keys answered with a raw chart slice
    #[serde(default)]
    pub summary_misses: Vec<String>,
    pub window_messages: usize,
    pub estimated_tokens: usize,
    #[serde(default)]
    pub has_digest: bool,
}

impl TurnRecord {
    /// Share of requested keys served from the summary cache
    pub fn hit_ratio(&self) -> Option<f64> {
        let total = self.summary_hits.len() + self.summary_misses.len();
        if total == 0 {
            return None;
        }
        Some(self.summary_hits.len() as f64 / total as f64)
    }
}
