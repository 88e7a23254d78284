use async_trait::async_trait;
use natal_core::SummarizerConfig;
use serde_json::Value;
use tracing::debug;

use crate::prompt::build_prompt;
use crate::{SummarizeError, Summarizer};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Summarizer backed by the Anthropic Messages API
pub struct AnthropicSummarizer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    config: SummarizerConfig,
}

impl AnthropicSummarizer {
    pub fn new(api_key: impl Into<String>, config: SummarizerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: MESSAGES_URL.to_string(),
            config,
        }
    }

    /// Read the key from `ANTHROPIC_API_KEY`; `None` when unset or empty
    pub fn from_env(config: SummarizerConfig) -> Option<Self> {
        std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|key| Self::new(key, config))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_body(&self, instruction: &str, input: &Value) -> Value {
        let prompt = build_prompt(instruction, input, self.config.max_input_chars);
        serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{"role": "user", "content": prompt}]
        })
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn summarize(&self, instruction: &str, input: &Value) -> Result<String, SummarizeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.request_body(instruction, input))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let text = extract_text(&body).ok_or(SummarizeError::Empty)?;
        debug!(model = %self.config.model, chars = text.len(), "summary received");
        Ok(text)
    }
}

/// Concatenate the text blocks of a Messages API response
fn extract_text(body: &Value) -> Option<String> {
    let text: String = body["content"]
        .as_array()?
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
