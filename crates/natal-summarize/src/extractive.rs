use async_trait::async_trait;
use serde_json::Value;

use crate::{SummarizeError, Summarizer};

/// Offline summarizer: flattens the input to text and keeps the leading sentences.
///
/// Used when no model API key is configured. The instruction is ignored.
pub struct ExtractiveSummarizer {
    max_sentences: usize,
}

impl ExtractiveSummarizer {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn summarize(&self, _instruction: &str, input: &Value) -> Result<String, SummarizeError> {
        let mut lines = Vec::new();
        flatten(input, "", &mut lines);
        let digest = leading_sentences(&lines.join(". "), self.max_sentences);
        if digest.is_empty() {
            return Err(SummarizeError::Empty);
        }
        Ok(digest)
    }
}

fn flatten(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{} {}", path, key)
                };
                flatten(nested, &child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten(item, path, out);
            }
        }
        Value::Null => {}
        Value::String(text) if path.is_empty() => out.push(text.trim().to_string()),
        Value::String(text) => out.push(format!("{}: {}", path, text.trim())),
        scalar if path.is_empty() => out.push(scalar.to_string()),
        scalar => out.push(format!("{}: {}", path, scalar)),
    }
}

fn leading_sentences(content: &str, max_sentences: usize) -> String {
    let sentences: Vec<&str> = content
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let kept = sentences.len().min(max_sentences);
    let mut digest = sentences[..kept].join(". ");
    if !digest.is_empty() {
        digest.push_str(if kept < sentences.len() { "..." } else { "." });
    }
    digest
}
