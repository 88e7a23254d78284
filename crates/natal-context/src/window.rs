//! Bounded conversation window with rolling digest compaction

use std::sync::Arc;

use natal_core::{ChatMessage, Role, SubjectId, WindowConfig};
use natal_store::MessageRepo;
use natal_summarize::prompt::COMPACTION_INSTRUCTION;
use natal_summarize::Summarizer;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ContextError;
use crate::flight::InFlight;
use crate::tasks::BackgroundTasks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    BelowThreshold { uncompacted: usize },
    AlreadyRunning,
    Compacted { compacted: usize, kept: usize },
}

#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub user: ChatMessage,
    pub assistant: ChatMessage,
    pub uncompacted: usize,
    pub compaction_scheduled: bool,
}

pub struct WindowManager {
    compactor: Compactor,
    tasks: BackgroundTasks,
    in_flight: InFlight<SubjectId>,
}

impl WindowManager {
    pub fn new(
        messages: MessageRepo,
        summarizer: Arc<dyn Summarizer>,
        tasks: BackgroundTasks,
        config: WindowConfig,
    ) -> Self {
        Self {
            compactor: Compactor {
                messages,
                summarizer,
                config,
            },
            tasks,
            in_flight: InFlight::new(),
        }
    }

    /// Record one exchange; schedules compaction once the live count passes
    /// `max_messages + slack`
    pub fn append_turn(
        &self,
        subject: &SubjectId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<AppendOutcome, ContextError> {
        let (user, assistant) = self
            .compactor
            .messages
            .append_turn(subject, user_text, assistant_text)?;
        let (uncompacted, compaction_scheduled) = self.check_threshold(subject)?;

        Ok(AppendOutcome {
            user,
            assistant,
            uncompacted,
            compaction_scheduled,
        })
    }

    /// Record a single user or assistant message
    pub fn append_message(
        &self,
        subject: &SubjectId,
        role: Role,
        text: &str,
    ) -> Result<ChatMessage, ContextError> {
        let message = self.compactor.messages.append(subject, role, text)?;
        self.check_threshold(subject)?;
        Ok(message)
    }

    /// Run compaction now, unless one is already running for `subject`
    pub async fn compact(&self, subject: &SubjectId) -> Result<CompactionOutcome, ContextError> {
        let Some(_guard) = self.in_flight.try_claim(subject.clone()) else {
            return Ok(CompactionOutcome::AlreadyRunning);
        };
        self.compactor.run(subject).await
    }

    /// Digest (if any) followed by live messages, chronologically
    pub fn conversation(&self, subject: &SubjectId) -> Result<Vec<ChatMessage>, ContextError> {
        Ok(self.compactor.messages.conversation(subject)?)
    }

    pub fn history(&self, subject: &SubjectId, limit: usize) -> Result<Vec<ChatMessage>, ContextError> {
        Ok(self.compactor.messages.history(subject, limit)?)
    }

    pub fn config(&self) -> &WindowConfig {
        &self.compactor.config
    }

    fn check_threshold(&self, subject: &SubjectId) -> Result<(usize, bool), ContextError> {
        let uncompacted = self.compactor.messages.count_uncompacted(subject)?;
        let scheduled =
            uncompacted > self.compactor.config.threshold() && self.schedule_compaction(subject);
        Ok((uncompacted, scheduled))
    }

    fn schedule_compaction(&self, subject: &SubjectId) -> bool {
        let Some(guard) = self.in_flight.try_claim(subject.clone()) else {
            debug!(subject = %subject, "compaction already in flight");
            return false;
        };

        let compactor = self.compactor.clone();
        let subject = subject.clone();
        self.tasks.spawn("compact_history", async move {
            let _guard = guard;
            if let Err(e) = compactor.run(&subject).await {
                warn!(subject = %subject, error = %e, "compaction failed, history left as is");
            }
        })
    }
}

#[derive(Clone)]
struct Compactor {
    messages: MessageRepo,
    summarizer: Arc<dyn Summarizer>,
    config: WindowConfig,
}

impl Compactor {
    async fn run(&self, subject: &SubjectId) -> Result<CompactionOutcome, ContextError> {
        let live = self.messages.uncompacted(subject)?;
        if live.len() <= self.config.threshold() {
            return Ok(CompactionOutcome::BelowThreshold {
                uncompacted: live.len(),
            });
        }

        let kept = self.config.keep_recent().min(live.len());
        let (selected, _recent) = live.split_at(live.len() - kept);
        let Some(last) = selected.last() else {
            return Ok(CompactionOutcome::BelowThreshold {
                uncompacted: live.len(),
            });
        };

        let previous = self.messages.digest(subject)?;
        let input = transcript(previous.as_ref(), selected);
        let digest = self
            .summarizer
            .summarize(COMPACTION_INSTRUCTION, &input)
            .await?;

        let compacted = self.messages.apply_compaction(subject, last.id, &digest)?;
        info!(subject = %subject, compacted, kept, "conversation compacted");
        Ok(CompactionOutcome::Compacted { compacted, kept })
    }
}

/// Summarizer input: the previous digest, then the selected messages
fn transcript(previous: Option<&ChatMessage>, selected: &[ChatMessage]) -> Value {
    let mut text = String::new();
    if let Some(digest) = previous {
        text.push_str("Previous digest: ");
        text.push_str(digest.text.trim());
        text.push_str("\n\n");
    }
    for message in selected {
        text.push_str(message.role.as_str());
        text.push_str(": ");
        text.push_str(message.text.trim());
        text.push('\n');
    }
    Value::String(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(id: i64, role: Role, text: &str) -> ChatMessage {
        ChatMessage {
            id,
            subject_id: SubjectId::new("s1"),
            role,
            text: text.to_string(),
            created_at: Utc::now(),
            is_compacted: false,
        }
    }

    #[test]
    fn test_transcript_folds_previous_digest() {
        let digest = message(1, Role::Summary, "They asked about Saturn.");
        let selected = vec![
            message(2, Role::User, "And Jupiter?"),
            message(3, Role::Assistant, "Jupiter is exalted."),
        ];
        let input = transcript(Some(&digest), &selected);
        assert_eq!(
            input.as_str().unwrap(),
            "Previous digest: They asked about Saturn.\n\nuser: And Jupiter?\nassistant: Jupiter is exalted.\n"
        );
    }

    #[test]
    fn test_transcript_without_digest() {
        let input = transcript(None, &[message(2, Role::User, " hi ")]);
        assert_eq!(input.as_str().unwrap(), "user: hi\n");
    }
}
