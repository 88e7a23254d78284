use natal_context::TurnRequest;
use natal_core::{SubjectId, TopicKey};

use super::App;

pub async fn run(
    subject: &str,
    user: &str,
    assistant: &str,
    keys: &[TopicKey],
) -> anyhow::Result<()> {
    let app = App::open()?;
    let subject = SubjectId::new(subject);

    let context = app
        .assembler
        .assemble(&subject, &TurnRequest::new(keys.iter().copied()))
        .await?;
    println!("{}", context.render());
    println!("(~{} tokens)", context.estimated_tokens);

    let outcome = app.assembler.record_turn(&subject, user, assistant)?;
    if outcome.compaction_scheduled {
        println!(
            "{} live messages, compacting down to {}",
            outcome.uncompacted,
            app.config.window.keep_recent()
        );
    }

    app.finish().await;
    Ok(())
}
