use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use natal_context::PrecomputedOracle;
use natal_core::{BirthData, SubjectId};
use natal_telemetry::Paths;
use serde_json::Value;

use super::App;

pub async fn run(
    subject: &str,
    chart_path: &Path,
    born: DateTime<Utc>,
    lat: f64,
    lon: f64,
) -> anyhow::Result<()> {
    let chart = read_chart(chart_path)?;
    let birth = BirthData {
        instant: born,
        latitude: lat,
        longitude: lon,
    };
    validate_birth(&birth)?;

    let app = App::open_with(Paths::new()?, Arc::new(PrecomputedOracle::new(chart)))?;
    let subject = SubjectId::new(subject);
    let generation = app.assembler.charts().onboard(&subject, &birth).await?;
    let stats = app.assembler.charts().repo().stats(&subject)?;

    println!("✓ Imported chart for {} (generation {})", subject, generation);
    if let Some(stats) = stats {
        println!(
            "  {} bytes raw, {} stored ({:.0}% of original)",
            stats.raw_bytes,
            stats.stored_bytes,
            stats.ratio() * 100.0
        );
    }
    app.finish().await;
    Ok(())
}

fn read_chart(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read chart {}: {}", path.display(), e))?;
    let chart: Value = serde_json::from_str(&content)?;
    if !chart.is_object() {
        anyhow::bail!("chart {} is not a JSON object", path.display());
    }
    Ok(chart)
}

fn validate_birth(birth: &BirthData) -> anyhow::Result<()> {
    if !(-90.0..=90.0).contains(&birth.latitude) {
        anyhow::bail!("latitude {} out of range", birth.latitude);
    }
    if !(-180.0..=180.0).contains(&birth.longitude) {
        anyhow::bail!("longitude {} out of range", birth.longitude);
    }
    Ok(())
}
