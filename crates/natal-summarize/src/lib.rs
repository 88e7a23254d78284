//! Text summarization behind a trait: prompt building, an Anthropic-backed
//! implementation and an offline extractive fallback

mod anthropic;
mod extractive;
pub mod prompt;

pub use anthropic::AnthropicSummarizer;
pub use extractive::ExtractiveSummarizer;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("summarizer returned no text")]
    Empty,
}

/// Turns an instruction plus structured input into a short text.
///
/// Used for per-topic chart summaries and for conversation compaction.
/// No latency bound is assumed.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, instruction: &str, input: &Value) -> Result<String, SummarizeError>;
}
