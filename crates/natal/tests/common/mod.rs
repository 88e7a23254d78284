#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use natal_context::{PrecomputedOracle, TurnAssembler};
use natal_core::{BirthData, Config, SubjectId};
use natal_store::Database;
use natal_summarize::ExtractiveSummarizer;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn subject() -> SubjectId {
    SubjectId::new("ana")
}

pub fn birth() -> BirthData {
    BirthData {
        instant: Utc.with_ymd_and_hms(1992, 3, 21, 23, 15, 0).unwrap(),
        latitude: -23.55,
        longitude: -46.63,
    }
}

/// A chart shaped like the oracle's output, dasha tree included
pub fn sample_chart() -> Value {
    json!({
        "planets": {
            "Sun": {"sign": "Pisces", "house": 6, "degree": 7},
            "Moon": {"sign": "Taurus", "house": 8, "exalted": true},
            "Mars": {"sign": "Aquarius", "house": 5}
        },
        "houses": {
            "1": {"sign": "Leo", "lord": "Sun"},
            "7": {"sign": "Aquarius", "lord": "Saturn"}
        },
        "divisional": {
            "D9": {"ascendant": "Sagittarius", "Venus": "Pisces"},
            "D10": {"ascendant": "Virgo", "Sun": "Aries"}
        },
        "yogas": [
            {"name": "Gajakesari", "planets": ["Moon", "Jupiter"]},
            {"name": "Budhaditya", "planets": ["Sun", "Mercury"]}
        ],
        "strengths": {"Sun": 61, "Moon": 78, "Mars": 49},
        "dasha": {
            "Rahu": {"start": "2012-05-01", "end": "2030-05-01", "antardasha": {
                "Rahu": {"start": "2012-05-01", "end": "2015-01-10"},
                "Jupiter": {"start": "2015-01-10", "end": "2017-06-05", "pratyantardasha": {
                    "Jupiter": {"start": "2015-01-10", "end": "2015-05-28"},
                    "Saturn": {"start": "2015-05-28", "end": "2015-11-09"}
                }},
                "Saturn": {"start": "2017-06-05", "end": "2020-04-12"},
                "Mercury": {"start": "2020-04-12", "end": "2030-05-01"}
            }},
            "Jupiter": {"start": "2030-05-01", "end": "2046-05-01"}
        }
    })
}

pub fn open_assembler(db_path: &Path, config: &Config) -> TurnAssembler {
    TurnAssembler::new(
        Database::open(db_path).unwrap(),
        Arc::new(PrecomputedOracle::new(sample_chart())),
        Arc::new(ExtractiveSummarizer::new(config.summarizer.extractive_sentences)),
        config,
    )
}

pub async fn drain(assembler: &TurnAssembler) {
    assert!(assembler.drain(Duration::from_secs(5)).await, "background work did not finish");
}
