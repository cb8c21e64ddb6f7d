//! Streaming client for an Ollama-compatible `/api/generate` endpoint.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AiClient, AiClientMetadata, AiError};
use crate::utils::settings::get_env_var;

/// Model used when neither flag, environment nor settings name one.
pub const DEFAULT_MODEL: &str = "mistral";

/// Server address used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Generation request body.
#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// One newline-delimited JSON object of the response stream.
#[derive(Deserialize, Debug)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Splits a byte stream into NDJSON lines and extracts `response` fragments.
///
/// Lines that are blank or not valid chunk objects are skipped, as are empty
/// fragments. Everything after the chunk marked `done` is ignored.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    done: bool,
}

impl StreamDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the server has sent its final chunk.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds raw bytes and returns the fragments of every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        self.pending.extend_from_slice(bytes);

        let mut fragments = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            fragments.extend(self.accept(&line));
            if self.done {
                self.pending.clear();
                break;
            }
        }
        fragments
    }

    /// Flushes a trailing line that had no terminating newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        self.accept(&line)
    }

    fn accept(&mut self, line: &[u8]) -> Option<String> {
        let chunk = decode_line(line)?;
        self.done = chunk.done;
        (!chunk.response.is_empty()).then_some(chunk.response)
    }
}

fn decode_line(line: &[u8]) -> Option<GenerateChunk> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<GenerateChunk>(text) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            debug!(error = %e, "Skipping unparsable stream line");
            None
        }
    }
}

/// Streaming client for a local Ollama server.
pub struct OllamaClient {
    client: Client,
    model: String,
    base_url: String,
}

impl OllamaClient {
    /// Creates a client for `model` at `base_url`.
    pub fn new(model: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            model,
            base_url,
        }
    }

    /// Creates a client from overrides, falling back to `OLLAMA_MODEL` and
    /// `OLLAMA_BASE_URL` (environment, then settings file), then defaults.
    pub fn from_settings(model: Option<String>, base_url: Option<String>) -> Self {
        let model = model
            .or_else(|| get_env_var("OLLAMA_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = base_url
            .or_else(|| get_env_var("OLLAMA_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(model, base_url)
    }

    /// Returns the configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

impl AiClient for OllamaClient {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        on_fragment: &'a mut (dyn FnMut(&str) + Send),
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.generate_url();
            let request = GenerateRequest {
                model: &self.model,
                prompt,
                stream: true,
            };

            info!(url = %url, model = %self.model, prompt_len = prompt.len(), "Sending generation request");

            let mut response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| AiError::Connection {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(AiError::ApiRequestFailed { status, body }.into());
            }

            let mut decoder = StreamDecoder::new();
            let mut text = String::new();

            while !decoder.is_done() {
                let Some(bytes) = response
                    .chunk()
                    .await
                    .map_err(|e| AiError::Stream(e.to_string()))?
                else {
                    break;
                };
                for fragment in decoder.push(&bytes) {
                    on_fragment(&fragment);
                    text.push_str(&fragment);
                }
            }
            if let Some(fragment) = decoder.finish() {
                on_fragment(&fragment);
                text.push_str(&fragment);
            }

            debug!(response_len = text.len(), "Generation stream finished");
            if text.trim().is_empty() {
                return Err(AiError::EmptyResponse.into());
            }
            Ok(text)
        })
    }

    fn get_metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: "Ollama".to_string(),
            model: self.model.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn decoder_handles_lines_split_across_chunks() {
        let mut decoder = StreamDecoder::new();

        let first = decoder.push(br#"{"response":"fix(ui): "}"#);
        assert!(first.is_empty());

        let second = decoder.push(b"\n{\"response\":\"align\"");
        assert_eq!(second, vec!["fix(ui): "]);

        let third = decoder.push(b"}\n{\"response\":\" cards\",\"done\":true}");
        assert_eq!(third, vec!["align"]);

        assert_eq!(decoder.finish().as_deref(), Some(" cards"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_skips_garbage_lines() {
        let mut decoder = StreamDecoder::new();

        let fragments = decoder.push(b"not json\n\n{\"response\":\"\"}\n{\"response\":\"ok\"}\n");

        assert_eq!(fragments, vec!["ok"]);
        assert!(!decoder.is_done());
    }

    #[test]
    fn decoder_stops_at_done_chunk() {
        let mut decoder = StreamDecoder::new();

        let fragments = decoder.push(
            b"{\"response\":\"feat: x\"}\n{\"response\":\"\",\"done\":true}\n{\"response\":\"late\"}\n",
        );

        assert_eq!(fragments, vec!["feat: x"]);
        assert!(decoder.is_done());
        assert!(decoder.push(b"{\"response\":\"more\"}\n").is_empty());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn generate_url_strips_trailing_slash() {
        let client = OllamaClient::new("mistral".to_string(), "http://localhost:11434/".to_string());
        assert_eq!(client.generate_url(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn overrides_win_over_defaults() {
        let client = OllamaClient::from_settings(
            Some("llama3".to_string()),
            Some("http://10.0.0.2:11434".to_string()),
        );
        assert_eq!(client.model(), "llama3");
        assert_eq!(client.get_metadata().provider, "Ollama");
        assert_eq!(client.generate_url(), "http://10.0.0.2:11434/api/generate");
    }
}
