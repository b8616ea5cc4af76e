//! Gemini `streamGenerateContent` over server-sent events.

use std::pin::Pin;

use anyhow::{bail, Context, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{ensure_success, http_client, require_key, TextGenerator, Vendor};
use crate::config::Config;

const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn from_config(cfg: &Config, temperature: f32) -> Result<Self> {
        let api_key = require_key(cfg, "GOOGLE_API_KEY")?;
        let base_url = cfg
            .get_non_empty("GEMINI_API_BASE")
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com".into())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            http: http_client(cfg)?,
            base_url,
            api_key,
            model: cfg.get_non_empty("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-pro".into()),
            temperature,
            max_output_tokens: cfg.get_u32("GEMINI_MAX_TOKENS").unwrap_or(8192),
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let safety: Vec<serde_json::Value> = HARM_CATEGORIES
            .iter()
            .map(|c| serde_json::json!({ "category": c, "threshold": "BLOCK_NONE" }))
            .collect();
        serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
            "safetySettings": safety,
        })
    }

    /// Stream response chunks in arrival order until the server closes the connection.
    fn chunk_stream(&self, prompt: &str) -> Pin<Box<dyn Stream<Item = Result<GenerateResponse>> + Send>> {
        let http = self.http.clone();
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        let api_key = self.api_key.clone();
        let body = self.request_body(prompt);

        Box::pin(try_stream! {
            let resp = http
                .post(url)
                .header("x-goog-api-key", api_key)
                .json(&body)
                .send()
                .await
                .context("failed to send Gemini request")?;
            let resp = ensure_success(Vendor::Gemini, resp).await?;

            let mut buf: Vec<u8> = Vec::new();
            let mut bytes = resp.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.context("Gemini stream error")?;
                buf.extend_from_slice(&chunk);
                for line in take_complete_lines(&mut buf)? {
                    if let Some(parsed) = parse_event_line(&line)? {
                        yield parsed;
                    }
                }
            }
            let rest = std::str::from_utf8(&buf).context("Gemini stream is not valid UTF-8")?;
            if let Some(parsed) = parse_event_line(rest)? {
                yield parsed;
            }
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn vendor(&self) -> Vendor {
        Vendor::Gemini
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut stream = self.chunk_stream(prompt);
        let mut full = String::new();
        let mut last_candidate: Option<Candidate> = None;
        let mut usage: Option<UsageMetadata> = None;
        let mut block_reason: Option<String> = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
                block_reason = Some(reason);
            }
            if chunk.usage_metadata.is_some() {
                usage = chunk.usage_metadata;
            }
            if let Some(candidate) = chunk.candidates.into_iter().next() {
                full.push_str(&candidate.text());
                last_candidate = Some(candidate);
            }
        }

        if let Some(candidate) = &last_candidate {
            if candidate.finish_reason.as_deref() == Some("SAFETY") {
                let message = safety_message(&candidate.safety_ratings);
                warn!("{}", message.trim_end());
                return Ok(message);
            }
        } else if let Some(reason) = block_reason {
            bail!("Gemini blocked the prompt: {}", reason);
        }

        if let Some(u) = usage {
            info!(
                prompt_tokens = u.prompt_token_count.unwrap_or_default(),
                response_tokens = u.candidates_token_count.unwrap_or_default(),
                "Gemini token usage"
            );
        }
        Ok(full)
    }
}

/// Split off every newline-terminated line in `buf`, leaving a partial tail behind.
///
/// Lines are decoded only once complete, so a multi-byte character split across
/// network chunks is reassembled before decoding.
fn take_complete_lines(buf: &mut Vec<u8>) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buf.drain(..=pos).collect();
        lines.push(String::from_utf8(line).context("Gemini stream is not valid UTF-8")?);
    }
    Ok(lines)
}

fn parse_event_line(line: &str) -> Result<Option<GenerateResponse>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    match serde_json::from_str::<GenerateResponse>(payload.trim()) {
        Ok(chunk) => {
            if let Some(err) = chunk.error {
                bail!("Gemini API error: {}", err.message);
            }
            Ok(Some(chunk))
        }
        Err(e) => {
            debug!(error = %e, "ignoring malformed Gemini event");
            Ok(None)
        }
    }
}

fn safety_message(ratings: &[SafetyRating]) -> String {
    let mut message = String::from("Content was filtered due to safety concerns:\n");
    for rating in ratings {
        message.push_str(&format!(
            "- Category: {}, Probability: {}\n",
            rating.category, rating.probability
        ));
    }
    message
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SafetyRating {
    category: String,
    probability: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let uri = server.uri();
        let cfg = Config::with_values(&[
            ("GOOGLE_API_KEY", "test-key"),
            ("GEMINI_API_BASE", uri.as_str()),
        ]);
        GeminiClient::from_config(&cfg, 0.0).unwrap()
    }

    fn sse(events: &[&str]) -> String {
        events.iter().map(|e| format!("data: {}\r\n\r\n", e)).collect()
    }

    #[tokio::test]
    async fn accumulates_streamed_chunks() {
        let server = MockServer::start().await;
        let body = sse(&[
            r##"{"candidates":[{"content":{"parts":[{"text":"# Monthly "}],"role":"model"}}]}"##,
            r#"{"candidates":[{"content":{"parts":[{"text":"Report"}],"role":"model"},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":3}}"#,
        ]);
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-pro:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "prompt" }] }],
                "generationConfig": { "temperature": 0.0, "maxOutputTokens": 8192 },
                "safetySettings": [
                    { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).generate("prompt").await.unwrap();
        assert_eq!(text, "# Monthly Report");
    }

    #[tokio::test]
    async fn safety_finish_reports_ratings() {
        let server = MockServer::start().await;
        let body = sse(&[
            r#"{"candidates":[{"finishReason":"SAFETY","safetyRatings":[{"category":"HARM_CATEGORY_HARASSMENT","probability":"HIGH"},{"category":"HARM_CATEGORY_HATE_SPEECH","probability":"NEGLIGIBLE"}]}]}"#,
        ]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let text = client_for(&server).generate("prompt").await.unwrap();
        assert_eq!(
            text,
            "Content was filtered due to safety concerns:\n\
             - Category: HARM_CATEGORY_HARASSMENT, Probability: HIGH\n\
             - Category: HARM_CATEGORY_HATE_SPEECH, Probability: NEGLIGIBLE\n"
        );
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("prompt").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("gemini API error: 400"), "{msg}");
        assert!(msg.contains("API key not valid"), "{msg}");
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_error() {
        let server = MockServer::start().await;
        let body = sse(&[r#"{"promptFeedback":{"blockReason":"OTHER"}}"#]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("prompt").await.unwrap_err();
        assert_eq!(err.to_string(), "Gemini blocked the prompt: OTHER");
    }

    #[test]
    fn split_characters_are_rejoined_before_decoding() {
        let event = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"café\"}]}}]}\n".as_bytes();
        let split = event.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut buf = event[..split].to_vec();
        assert!(take_complete_lines(&mut buf).unwrap().is_empty());
        buf.extend_from_slice(&event[split..]);
        let lines = take_complete_lines(&mut buf).unwrap();
        assert!(buf.is_empty());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("café"), "{}", lines[0]);
    }

    #[test]
    fn invalid_utf8_line_is_an_error() {
        let mut buf = b"data: \xff\xfe\n".to_vec();
        assert!(take_complete_lines(&mut buf).is_err());
    }

    /// Serves one HTTP response whose body is written in two parts with a pause between.
    async fn serve_in_two_writes(first: Vec<u8>, second: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Read the whole request so closing the socket does not reset it.
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                request.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&first).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            socket.write_all(&second).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn multibyte_text_split_across_writes_survives() {
        let event = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"café naïve\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n"
            .as_bytes()
            .to_vec();
        let split = event.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let base = serve_in_two_writes(event[..split].to_vec(), event[split..].to_vec()).await;

        let cfg = Config::with_values(&[("GOOGLE_API_KEY", "test-key"), ("GEMINI_API_BASE", base.as_str())]);
        let text = GeminiClient::from_config(&cfg, 0.0).unwrap().generate("prompt").await.unwrap();
        assert_eq!(text, "café naïve");
    }

    #[test]
    fn event_lines_skip_comments_and_garbage() {
        assert!(parse_event_line(": keep-alive\n").unwrap().is_none());
        assert!(parse_event_line("event: message\n").unwrap().is_none());
        assert!(parse_event_line("data: not json\n").unwrap().is_none());
        assert!(parse_event_line(r#"data: {"error":{"code":429,"message":"quota"}}"#).is_err());
    }
}
