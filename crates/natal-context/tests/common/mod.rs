#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use natal_context::{PrecomputedOracle, TurnAssembler};
use natal_core::{BirthData, Config, SubjectId};
use natal_store::Database;
use natal_summarize::{SummarizeError, Summarizer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn subject() -> SubjectId {
    SubjectId::new("subj-1")
}

pub fn birth() -> BirthData {
    BirthData {
        instant: Utc.with_ymd_and_hms(1990, 6, 15, 4, 30, 0).unwrap(),
        latitude: 28.61,
        longitude: 77.21,
    }
}

pub fn sample_chart() -> Value {
    json!({
        "planets": {
            "Sun": {"sign": "Gemini", "house": 3},
            "Moon": {"sign": "Scorpio", "house": 8, "debilitated": true}
        },
        "houses": {"1": {"sign": "Aries", "lord": "Mars"}},
        "divisional": {
            "D9": {"ascendant": "Libra"},
            "D10": {"ascendant": "Capricorn"}
        },
        "yogas": [{"name": "Gajakesari", "strength": "medium"}],
        "strengths": {"Jupiter": 7.2, "Saturn": 4.1},
        "dasha": {
            "Saturn": {"start": "2015-01-01", "end": "2034-01-01", "antardasha": {
                "Saturn": {"start": "2015-01-01", "end": "2018-01-01"},
                "Mercury": {"start": "2018-01-01", "end": "2034-01-01"}
            }},
            "Mercury": {"start": "2034-01-01", "end": "2051-01-01"}
        }
    })
}

/// Summarizer double that counts calls and records its inputs
pub struct CountingSummarizer {
    calls: AtomicUsize,
    inputs: Mutex<Vec<Value>>,
    delay: Duration,
    fail: bool,
}

impl CountingSummarizer {
    pub fn new() -> Arc<Self> {
        Self::build(Duration::ZERO, false)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(delay, false)
    }

    pub fn failing() -> Arc<Self> {
        Self::build(Duration::ZERO, true)
    }

    fn build(delay: Duration, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
            delay,
            fail,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<Value> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for CountingSummarizer {
    fn name(&self) -> &str {
        "counting"
    }

    async fn summarize(&self, _instruction: &str, input: &Value) -> Result<String, SummarizeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.inputs.lock().unwrap().push(input.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(SummarizeError::Empty);
        }
        Ok(format!("summary #{n}"))
    }
}

pub fn small_window_config() -> Config {
    let mut config = Config::default();
    config.window.max_messages = 5;
    config.window.slack = 5;
    config
}

/// Assembler over an in-memory database with the sample chart onboarded
pub async fn onboarded(summarizer: Arc<CountingSummarizer>, config: &Config) -> TurnAssembler {
    let assembler = TurnAssembler::new(
        Database::in_memory().unwrap(),
        Arc::new(PrecomputedOracle::new(sample_chart())),
        summarizer,
        config,
    );
    assembler
        .charts()
        .onboard(&subject(), &birth())
        .await
        .unwrap();
    assembler
}

pub async fn drain(assembler: &TurnAssembler) {
    assert!(assembler.drain(Duration::from_secs(5)).await, "background work did not finish");
}
