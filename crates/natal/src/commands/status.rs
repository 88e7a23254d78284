use chrono::{DateTime, Utc};
use natal_core::{SubjectId, WindowConfig};
use natal_store::{ChartRepo, Database, MessageRepo, SummaryRepo};
use serde_json::{json, Value};

use super::App;

pub fn run(subject: &str) -> anyhow::Result<()> {
    let app = App::open()?;
    let output = collect(&app.db, &SubjectId::new(subject), &app.config.window, Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn collect(
    db: &Database,
    subject: &SubjectId,
    window: &WindowConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<Value> {
    let charts = ChartRepo::new(db.clone());
    let summaries = SummaryRepo::new(db.clone());
    let messages = MessageRepo::new(db.clone());

    let chart = charts.stats(subject)?.map(|stats| {
        json!({
            "generation": stats.generation,
            "raw_bytes": stats.raw_bytes,
            "stored_bytes": stats.stored_bytes,
            "ratio": (stats.ratio() * 1000.0).round() / 1000.0,
        })
    });

    let summaries: Vec<Value> = summaries
        .list(subject)?
        .into_iter()
        .map(|record| {
            json!({
                "key": record.topic_key,
                "fresh": record.is_fresh(now),
                "updated_at": record.updated_at,
                "expires_at": record.expires_at,
            })
        })
        .collect();

    Ok(json!({
        "subject": subject,
        "birth": charts.birth_data(subject)?,
        "chart": chart,
        "summaries": summaries,
        "window": {
            "uncompacted": messages.count_uncompacted(subject)?,
            "threshold": window.threshold(),
            "has_digest": messages.digest(subject)?.is_some(),
        },
    }))
}
