use natal_core::{ChatMessage, SubjectId};

use super::App;

pub fn run(subject: &str, limit: usize) -> anyhow::Result<()> {
    let app = App::open()?;
    let subject = SubjectId::new(subject);
    let messages = app.assembler.window().history(&subject, limit)?;

    if messages.is_empty() {
        println!("No messages for {}", subject);
        return Ok(());
    }

    println!("Recent Messages (last {})", messages.len());
    println!("========================");
    for message in &messages {
        println!("{}", format_message(message));
    }
    Ok(())
}

fn format_message(message: &ChatMessage) -> String {
    let marker = if message.is_compacted { " [compacted]" } else { "" };
    format!(
        "  {} | {:<9}{} {}",
        message.created_at.format("%Y-%m-%d %H:%M"),
        message.role.as_str(),
        marker,
        message.text.trim()
    )
}
