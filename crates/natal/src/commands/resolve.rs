use std::collections::BTreeSet;

use natal_core::{SubjectId, TopicKey};

use super::App;

pub async fn run(subject: &str, keys: &[TopicKey]) -> anyhow::Result<()> {
    let app = App::open()?;
    let keys: BTreeSet<TopicKey> = keys.iter().copied().collect();
    let resolved = app
        .assembler
        .cache()
        .resolve(&SubjectId::new(subject), &keys)
        .await?;

    println!("{}", serde_json::to_string_pretty(&resolved)?);
    app.finish().await;
    Ok(())
}
