//! Runtime configuration

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::TopicKey;

/// Conversation window sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Target number of live (uncompacted) messages
    pub max_messages: usize,

    /// Extra messages tolerated before compaction triggers
    pub slack: usize,
}

impl WindowConfig {
    /// Compaction runs once the uncompacted count exceeds this
    pub fn threshold(&self) -> usize {
        self.max_messages + self.slack
    }

    /// Most recent messages left untouched by a compaction run
    pub fn keep_recent(&self) -> usize {
        self.max_messages.saturating_sub(3)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_messages: 20,
            slack: 10,
        }
    }
}

/// Summary cache behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of the dasha summary; it describes "now" and goes stale
    pub dasha_ttl_days: i64,

    /// Concurrent background derivations and compactions
    pub max_background: usize,
}

impl CacheConfig {
    /// Lifetime of a freshly derived summary; `None` never expires, and so
    /// does a TTL too large to represent
    pub fn ttl_for(&self, key: TopicKey) -> Option<TimeDelta> {
        match key {
            TopicKey::Dasha => TimeDelta::try_days(self.dasha_ttl_days),
            TopicKey::Planets
            | TopicKey::Houses
            | TopicKey::Navamsa
            | TopicKey::Dasamsa
            | TopicKey::Yogas
            | TopicKey::Strengths => None,
        }
    }

    /// `expires_at` for a summary of `key` derived at `derived_at`
    pub fn expiry_for(&self, key: TopicKey, derived_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.ttl_for(key)
            .and_then(|ttl| derived_at.checked_add_signed(ttl))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dasha_ttl_days: 30,
            max_background: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub model: String,

    /// Serialized input beyond this many chars is truncated
    pub max_input_chars: usize,

    pub max_tokens: u32,

    /// Sentences kept by the offline extractive summarizer
    pub extractive_sentences: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-haiku-20240307".to_string(),
            max_input_chars: 10_000,
            max_tokens: 1024,
            extractive_sentences: 6,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub cache: CacheConfig,
    pub summarizer: SummarizerConfig,

    /// Append a record per assembled turn to `turns.jsonl`
    pub telemetry: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.window.max_messages, 20);
        assert_eq!(config.window.threshold(), 30);
        assert_eq!(config.window.keep_recent(), 17);
        assert!(!config.telemetry);
    }

    #[test]
    fn test_keep_recent_saturates() {
        let window = WindowConfig {
            max_messages: 2,
            slack: 0,
        };
        assert_eq!(window.keep_recent(), 0);
    }

    #[test]
    fn test_ttl_only_for_dasha() {
        let cache = CacheConfig::default();
        assert_eq!(cache.ttl_for(TopicKey::Dasha), TimeDelta::try_days(30));
        assert_eq!(cache.ttl_for(TopicKey::Navamsa), None);
    }

    #[test]
    fn test_huge_ttl_means_no_expiry() {
        let now = Utc::now();
        let cache = CacheConfig {
            dasha_ttl_days: i64::MAX,
            ..CacheConfig::default()
        };
        assert_eq!(cache.ttl_for(TopicKey::Dasha), None);
        assert_eq!(cache.expiry_for(TopicKey::Dasha, now), None);

        // representable as a delta, but past the end of the calendar
        let cache = CacheConfig {
            dasha_ttl_days: 100_000_000,
            ..CacheConfig::default()
        };
        assert!(cache.ttl_for(TopicKey::Dasha).is_some());
        assert_eq!(cache.expiry_for(TopicKey::Dasha, now), None);
    }

    #[test]
    fn test_expiry_counts_from_derivation_time() {
        let derived_at = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let cache = CacheConfig::default();
        assert_eq!(
            cache.expiry_for(TopicKey::Dasha, derived_at),
            Some(derived_at + TimeDelta::days(30))
        );
        assert_eq!(cache.expiry_for(TopicKey::Planets, derived_at), None);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"window":{"max_messages":5},"telemetry":true}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.window.max_messages, 5);
        assert_eq!(config.window.slack, 10);
        assert_eq!(config.cache.max_background, 8);
        assert!(config.telemetry);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.summarizer.max_input_chars, 10_000);
    }
}
