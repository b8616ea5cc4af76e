//! Vendor adapters behind one `generate(prompt) -> text` capability.
//!
//! Each hosted API gets its own request/response mapping in a submodule. The rest of
//! the program only sees [`TextGenerator`] and [`generate_report`].

pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::{fmt, str::FromStr, time::Duration};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{error, info};

use crate::config::Config;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// The hosted text-generation services the tool can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Gemini,
    Claude,
    Gpt4,
}

impl Vendor {
    pub const ALL: [Vendor; 3] = [Vendor::Gemini, Vendor::Claude, Vendor::Gpt4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Gemini => "gemini",
            Vendor::Claude => "claude",
            Vendor::Gpt4 => "gpt4",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match Vendor::ALL.into_iter().find(|v| v.as_str() == lower) {
            Some(v) => Ok(v),
            None => bail!("Unsupported model: {}", s.trim()),
        }
    }
}

/// Clap value parser for `--vendor`.
pub fn parse_vendor(s: &str) -> std::result::Result<Vendor, String> {
    s.parse::<Vendor>().map_err(|e| e.to_string())
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Send `prompt` as a single user message and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the adapter for `vendor`. Fails on missing credentials, before any request.
pub fn generator_for(vendor: Vendor, cfg: &Config, temperature: f32) -> Result<Box<dyn TextGenerator>> {
    let generator: Box<dyn TextGenerator> = match vendor {
        Vendor::Gemini => Box::new(GeminiClient::from_config(cfg, temperature)?),
        Vendor::Claude => Box::new(AnthropicClient::from_config(cfg, temperature)?),
        Vendor::Gpt4 => Box::new(OpenAiClient::from_config(cfg, temperature)?),
    };
    Ok(generator)
}

/// Run the generator and fold any failure into the returned text.
///
/// Failed calls come back as `An error occurred: <error>`; callers cannot tell
/// them apart from a report without inspecting the prefix.
pub async fn generate_report(generator: &dyn TextGenerator, prompt: &str) -> String {
    let vendor = generator.vendor();
    info!(%vendor, prompt_chars = prompt.len(), "requesting report");
    match generator.generate(prompt).await {
        Ok(text) => {
            info!(%vendor, report_chars = text.len(), "received report");
            text
        }
        Err(e) => {
            let message = format!("An error occurred: {:#}", e);
            error!(%vendor, "{}", message);
            message
        }
    }
}

pub(crate) fn http_client(cfg: &Config) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = cfg.request_timeout_secs() {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

pub(crate) fn require_key(cfg: &Config, key: &str) -> Result<String> {
    cfg.get_non_empty(key)
        .ok_or_else(|| anyhow::anyhow!("Missing {}. Set it in the environment, .env or the reportsmith config file", key))
}

/// Turn a non-success response into an error that carries the body.
pub(crate) async fn ensure_success(vendor: Vendor, resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    bail!("{} API error: {} - {}", vendor, status, body.trim())
}
