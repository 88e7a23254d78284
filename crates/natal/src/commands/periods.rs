use chrono::{DateTime, Utc};
use natal_core::periods::{active_at, current_period, overlapping};
use natal_core::SubjectId;
use serde_json::json;

use super::App;

pub async fn run(
    subject: &str,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> anyhow::Result<()> {
    let app = App::open()?;
    let tree = app
        .assembler
        .charts()
        .period_tree(&SubjectId::new(subject))
        .await?;

    let output = match range {
        Some((from, to)) => json!({
            "from": from,
            "to": to,
            "periods": overlapping(&tree, from, to),
        }),
        None => json!({
            "current": current_period(&tree),
            "active_now": active_at(&tree, Utc::now()),
        }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    app.finish().await;
    Ok(())
}
