use natal_context::CompactionOutcome;
use natal_core::SubjectId;

use super::App;

pub async fn run(subject: &str) -> anyhow::Result<()> {
    let app = App::open()?;
    let outcome = app
        .assembler
        .window()
        .compact(&SubjectId::new(subject))
        .await?;
    println!("{}", describe(&outcome, app.config.window.threshold()));
    app.finish().await;
    Ok(())
}

fn describe(outcome: &CompactionOutcome, threshold: usize) -> String {
    match outcome {
        CompactionOutcome::BelowThreshold { uncompacted } => format!(
            "Nothing to compact: {} live messages (threshold {})",
            uncompacted, threshold
        ),
        CompactionOutcome::AlreadyRunning => "A compaction is already running".to_string(),
        CompactionOutcome::Compacted { compacted, kept } => format!(
            "✓ Folded {} messages into the digest, {} kept live",
            compacted, kept
        ),
    }
}
