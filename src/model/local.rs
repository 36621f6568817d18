//! Local completion-server backend.
//!
//! Implements [`LanguageModel`] against an OpenAI-compatible server running
//! on this machine (for example `llama-server -m <weights>`), which serves
//! the GGUF weights fetched by [`download`](LanguageModel::download).
//! Completions are requested with `stream: true` and decoded from
//! server-sent events as they arrive.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;

use super::download::download_file;
use super::{ChatMessage, Completion, CompletionRequest, LanguageModel, ProgressCallback};
use crate::config::ModelConfig;

pub struct LocalServerModel {
    client: Client,
    endpoint: Url,
    model: String,
    weights_url: String,
    weights_path: PathBuf,
}

impl LocalServerModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).context("invalid model endpoint URL")?;
        // Idle limit per read, not a whole-request deadline: weight downloads
        // and long generations keep streaming well past it.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            endpoint,
            model: config.name.clone(),
            weights_url: config.weights_url.clone(),
            weights_path: config.weights_path(),
        })
    }

    fn url(&self, path: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }
}

#[async_trait]
impl LanguageModel for LocalServerModel {
    async fn is_downloaded(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(&self.weights_path).await.unwrap_or(false))
    }

    async fn download(&self, on_progress: ProgressCallback) -> Result<()> {
        if self.is_downloaded().await? {
            on_progress(1.0);
            return Ok(());
        }
        download_file(&self.client, &self.weights_url, &self.weights_path, &on_progress).await
    }

    async fn init(&self) -> Result<()> {
        anyhow::ensure!(
            self.is_downloaded().await?,
            "model weights not found at {}. Run `tulip model download` first.",
            self.weights_path.display()
        );

        let resp = self
            .client
            .get(self.url("/v1/models"))
            .send()
            .await
            .context("model server health request failed")?;
        anyhow::ensure!(
            resp.status().is_success(),
            "model server health check returned status {}",
            resp.status()
        );

        tracing::info!(endpoint = %self.endpoint, model = %self.model, "model server ready");
        Ok(())
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<Completion> {
        let payload = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
            messages: &request.messages,
        };

        let resp = self
            .client
            .post(self.url("/v1/chat/completions"))
            .json(&payload)
            .send()
            .await
            .context("completion request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("completion request status {status}: {body}"));
        }

        let mut decoder = SseDecoder::default();
        let mut text = String::new();
        let mut stream = resp.bytes_stream();

        'events: while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("error reading completion stream")?;
            for event in decoder.push(&chunk) {
                match event {
                    SseEvent::Done => break 'events,
                    SseEvent::Data(data) => {
                        if let Some(token) = extract_delta(&data)? {
                            text.push_str(&token);
                            on_token(&token);
                        }
                    }
                }
            }
        }

        tracing::debug!(chars = text.len(), "completion stream finished");
        Ok(Completion { text })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    messages: &'a [ChatMessage],
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Splits a byte stream into `data:` events, tolerating chunk boundaries
/// anywhere, including inside a multi-byte character.
#[derive(Default)]
struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                events.push(SseEvent::Done);
            } else if !data.is_empty() {
                events.push(SseEvent::Data(data.to_string()));
            }
        }

        events
    }
}

/// Pull the token text out of one streamed chunk.
fn extract_delta(data: &str) -> Result<Option<String>> {
    let value: Value = serde_json::from_str(data).context("malformed completion chunk")?;
    if let Some(message) = value.get("error").and_then(|e| e.get("message")) {
        return Err(anyhow!("model server error: {message}"));
    }
    let content = value
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
        .filter(|content| !content.is_empty())
        .map(str::to_string);
    Ok(content)
}
