//! Anthropic Messages API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{ensure_success, http_client, require_key, TextGenerator, Vendor};
use crate::config::Config;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_config(cfg: &Config, temperature: f32) -> Result<Self> {
        let api_key = require_key(cfg, "ANTHROPIC_API_KEY")?;
        let base_url = cfg
            .get_non_empty("ANTHROPIC_API_BASE")
            .unwrap_or_else(|| "https://api.anthropic.com".into())
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();
        Ok(Self {
            http: http_client(cfg)?,
            base_url,
            api_key,
            model: cfg
                .get_non_empty("CLAUDE_MODEL")
                .unwrap_or_else(|| "claude-3-sonnet-20240229".into()),
            temperature,
            max_tokens: cfg.get_u32("CLAUDE_MAX_TOKENS").unwrap_or(4096),
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    fn vendor(&self) -> Vendor {
        Vendor::Claude
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("failed to send Claude request")?;
        let resp = ensure_success(Vendor::Claude, resp).await?;
        let parsed: MessagesResponse = resp.json().await.context("malformed Claude response")?;

        if let Some(usage) = &parsed.usage {
            info!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = parsed.stop_reason.as_deref().unwrap_or(""),
                "Claude token usage"
            );
        }

        parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text.unwrap_or_default())
            .context("Claude response contained no content")
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
