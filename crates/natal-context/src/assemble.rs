//! Per-turn context assembly.
//!
//! [`TurnAssembler`] wires the chart service, summary cache and window
//! manager over one database and one background task pool, and builds the
//! context handed to the answering model for a single conversational turn.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use natal_core::periods::{current_period, overlapping};
use natal_core::{ChatMessage, Config, CurrentPeriod, PeriodNode, PeriodSpan, Role, SubjectId, TopicKey};
use natal_store::{ChartRepo, Database, MessageRepo, SummaryRepo};
use natal_summarize::Summarizer;
use natal_telemetry::{append_jsonl, estimate_tokens, TurnRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{Resolved, SummaryCache};
use crate::charts::ChartService;
use crate::error::ContextError;
use crate::oracle::ChartOracle;
use crate::tasks::BackgroundTasks;
use crate::window::{AppendOutcome, WindowManager};

/// What the caller wants in context this turn
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub keys: BTreeSet<TopicKey>,
    /// Half-open `[from, to)` range of periods to include
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl TurnRequest {
    pub fn new(keys: impl IntoIterator<Item = TopicKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            range: None,
        }
    }

    pub fn with_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.range = Some((from, to));
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnContext {
    pub subject_id: SubjectId,
    pub summaries: Vec<Resolved>,
    pub current: CurrentPeriod,
    pub periods: Vec<PeriodNode>,
    pub conversation: Vec<ChatMessage>,
    pub estimated_tokens: usize,
}

impl TurnContext {
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.summaries.is_empty() {
            out.push_str("## Chart\n");
            for resolved in &self.summaries {
                match (&resolved.summary, &resolved.raw_slice) {
                    (Some(summary), _) => {
                        let _ = writeln!(out, "### {}\n{}", resolved.key, summary.trim());
                    }
                    (None, Some(slice)) => {
                        let _ = writeln!(out, "### {} (raw)\n{}", resolved.key, slice);
                    }
                    (None, None) => {
                        let _ = writeln!(out, "### {}\nnot present in chart", resolved.key);
                    }
                }
            }
            out.push('\n');
        }

        if !self.current.is_empty() {
            out.push_str("## Current period\n");
            let chain: Vec<String> = [&self.current.major, &self.current.sub, &self.current.sub_sub]
                .into_iter()
                .flatten()
                .map(describe_span)
                .collect();
            let _ = writeln!(out, "{}\n", chain.join(" / "));
        }

        if !self.periods.is_empty() {
            out.push_str("## Periods in range\n");
            for node in &self.periods {
                write_node(&mut out, node, 0);
            }
            out.push('\n');
        }

        if !self.conversation.is_empty() {
            out.push_str("## Conversation\n");
            for message in &self.conversation {
                let label = match message.role {
                    Role::Summary => "earlier",
                    role => role.as_str(),
                };
                let _ = writeln!(out, "{}: {}", label, message.text.trim());
            }
        }

        out
    }

    pub fn has_digest(&self) -> bool {
        self.conversation.iter().any(|m| m.role == Role::Summary)
    }

    pub fn to_record(&self) -> TurnRecord {
        let (hits, misses): (Vec<&Resolved>, Vec<&Resolved>) =
            self.summaries.iter().partition(|r| r.is_hit());
        TurnRecord {
            subject_id: self.subject_id.to_string(),
            timestamp: Utc::now(),
            summary_hits: hits.iter().map(|r| r.key.to_string()).collect(),
            summary_misses: misses.iter().map(|r| r.key.to_string()).collect(),
            window_messages: self.conversation.len(),
            estimated_tokens: self.estimated_tokens,
            has_digest: self.has_digest(),
        }
    }
}

fn describe_span(span: &PeriodSpan) -> String {
    format!(
        "{} ({}..{})",
        span.planet,
        span.start.format("%Y-%m-%d"),
        span.end.format("%Y-%m-%d")
    )
}

fn write_node(out: &mut String, node: &PeriodNode, depth: usize) {
    let _ = writeln!(
        out,
        "{}- {}",
        "  ".repeat(depth),
        describe_span(&node.span())
    );
    for child in &node.children {
        write_node(out, child, depth + 1);
    }
}

pub struct TurnAssembler {
    charts: Arc<ChartService>,
    cache: SummaryCache,
    window: WindowManager,
    tasks: BackgroundTasks,
    turns_file: Option<PathBuf>,
}

impl TurnAssembler {
    pub fn new(
        db: Database,
        oracle: Arc<dyn ChartOracle>,
        summarizer: Arc<dyn Summarizer>,
        config: &Config,
    ) -> Self {
        let tasks = BackgroundTasks::new(config.cache.max_background);
        let charts = Arc::new(ChartService::new(ChartRepo::new(db.clone()), oracle));
        let cache = SummaryCache::new(
            SummaryRepo::new(db.clone()),
            Arc::clone(&charts),
            Arc::clone(&summarizer),
            tasks.clone(),
            config.cache.clone(),
        );
        let window = WindowManager::new(
            MessageRepo::new(db),
            summarizer,
            tasks.clone(),
            config.window.clone(),
        );
        Self {
            charts,
            cache,
            window,
            tasks,
            turns_file: None,
        }
    }

    /// Append a [`TurnRecord`] to `path` for every assembled turn
    pub fn with_telemetry(mut self, path: impl Into<PathBuf>) -> Self {
        self.turns_file = Some(path.into());
        self
    }

    pub fn charts(&self) -> &ChartService {
        &self.charts
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    pub fn window(&self) -> &WindowManager {
        &self.window
    }

    pub async fn assemble(
        &self,
        subject: &SubjectId,
        request: &TurnRequest,
    ) -> Result<TurnContext, ContextError> {
        let summaries = self.cache.resolve(subject, &request.keys).await?;
        let tree = self.charts.period_tree(subject).await?;
        let periods = match request.range {
            Some((from, to)) => overlapping(&tree, from, to),
            None => Vec::new(),
        };

        let mut context = TurnContext {
            subject_id: subject.clone(),
            summaries,
            current: current_period(&tree),
            periods,
            conversation: self.window.conversation(subject)?,
            estimated_tokens: 0,
        };
        context.estimated_tokens = estimate_tokens(&context.render());
        debug!(
            subject = %subject,
            tokens = context.estimated_tokens,
            messages = context.conversation.len(),
            "turn context assembled"
        );

        if let Some(path) = &self.turns_file {
            if let Err(e) = append_jsonl(path, &context.to_record()) {
                warn!(path = %path.display(), error = %e, "failed to write turn telemetry");
            }
        }
        Ok(context)
    }

    /// Persist the exchange that answered an assembled turn
    pub fn record_turn(
        &self,
        subject: &SubjectId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<AppendOutcome, ContextError> {
        self.window.append_turn(subject, user_text, assistant_text)
    }

    /// Wait for pending summaries and compactions; `false` on timeout
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tasks.drain(timeout).await
    }
}
