//! OpenAI Chat Completions (non-streaming).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ensure_success, http_client, require_key, TextGenerator, Vendor};
use crate::config::Config;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
}

#[derive(Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    pub fn from_config(cfg: &Config, temperature: f32) -> Result<Self> {
        let api_key = require_key(cfg, "OPENAI_API_KEY")?;
        let base_url = normalize_base_url(
            &cfg.get_non_empty("OPENAI_API_BASE")
                .unwrap_or_else(|| "https://api.openai.com/v1".into()),
        );
        Ok(Self {
            http: http_client(cfg)?,
            base_url,
            api_key,
            model: cfg.get_non_empty("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".into()),
            temperature,
            max_tokens: cfg.get_u32("OPENAI_MAX_TOKENS").unwrap_or(4096),
        })
    }
}

/// Ensure the base URL ends in `/v1` exactly once.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if !trimmed.ends_with("/v1") && !trimmed.contains("/v1/") {
        format!("{}/v1", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    fn vendor(&self) -> Vendor {
        Vendor::Gpt4
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages = vec![ChatMessage { role: Role::User, content: Some(prompt.to_string()) }];
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to send chat request")?;
        let resp = ensure_success(Vendor::Gpt4, resp).await?;
        let parsed: Completion = resp.json().await.context("malformed chat completion")?;

        if let Some(usage) = &parsed.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI token usage"
            );
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .context("chat completion contained no choices")?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
