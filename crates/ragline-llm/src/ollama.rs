//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Async HTTP communication with `POST /api/generate`
//! - Configurable endpoint, model and sampling temperature
//! - Incremental decoding of the newline-delimited JSON stream
//! - HTTP status mapped onto retryable / non-retryable errors
//!
//! # Examples
//!
//! ```no_run
//! use ragline_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.2")
//!     .unwrap()
//!     .with_temperature(0.0);
//! ```

use crate::{FragmentStream, GenerationProvider, LlmError};
use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Ollama API provider for local LLM inference
///
/// The client only bounds connection setup. Overall generation time is
/// bounded by the caller, which may simply drop the future or stream.
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// One NDJSON line (or the whole body when not streaming)
#[derive(Debug, Deserialize)]
struct OllamaGenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.2", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Other(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.0,
            client,
        })
    }

    /// Create a provider against `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn send(&self, prompt: &str, streaming: bool) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: streaming,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        debug!(model = %self.model, streaming, prompt_len = prompt.len(), "Ollama request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        match status_error(response.status(), &self.model) {
            Some(error) => Err(error),
            None => Ok(response),
        }
    }
}

/// Map a non-success HTTP status onto an error
fn status_error(status: reqwest::StatusCode, model: &str) -> Option<LlmError> {
    if status.is_success() {
        None
    } else if status == reqwest::StatusCode::NOT_FOUND {
        Some(LlmError::ModelNotAvailable(model.to_string()))
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Some(LlmError::RateLimitExceeded)
    } else if status.is_server_error() {
        Some(LlmError::Communication(format!("HTTP {}", status)))
    } else {
        Some(LlmError::Other(format!("HTTP {}", status)))
    }
}

/// Splits a byte stream into NDJSON lines
#[derive(Debug, Default)]
struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feed bytes, returning every completed non-empty line
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<OllamaGenerateChunk, LlmError>> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(parsed) = parse_line(&line) {
                lines.push(parsed);
            }
        }
        lines
    }

    /// Flush a trailing line without a newline
    fn finish(&mut self) -> Option<Result<OllamaGenerateChunk, LlmError>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<Result<OllamaGenerateChunk, LlmError>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<OllamaGenerateChunk>(text)
            .map_err(|e| LlmError::InvalidResponse(format!("Bad stream line: {}", e))),
    )
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: LineDecoder,
    pending: VecDeque<Result<String, LlmError>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    /// Queue the outcome of one decoded line
    fn accept(&mut self, line: Result<OllamaGenerateChunk, LlmError>) {
        if self.finished {
            return;
        }
        match line {
            Ok(chunk) => {
                if let Some(message) = chunk.error {
                    self.pending.push_back(Err(LlmError::Other(message)));
                    self.finished = true;
                    return;
                }
                if !chunk.response.is_empty() {
                    self.pending.push_back(Ok(chunk.response));
                }
                if chunk.done {
                    self.finished = true;
                }
            }
            Err(e) => {
                self.pending.push_back(Err(e));
                self.finished = true;
            }
        }
    }
}

/// Turn a raw NDJSON byte stream into answer fragments
fn decode_stream<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: LineDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for line in state.decoder.push(chunk.as_ref()) {
                        state.accept(line);
                    }
                }
                Some(Err(e)) => {
                    state
                        .pending
                        .push_back(Err(LlmError::Communication(format!("Stream interrupted: {}", e))));
                    state.finished = true;
                }
                None => {
                    if let Some(line) = state.decoder.finish() {
                        state.accept(line);
                    }
                    state.finished = true;
                }
            }
        }
    }))
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.send(prompt, false).await?;
        let chunk: OllamaGenerateChunk = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        match chunk.error {
            Some(message) => Err(LlmError::Other(message)),
            None => Ok(chunk.response),
        }
    }

    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream, LlmError> {
        let response = self.send(prompt, true).await?;
        Ok(decode_stream(response.bytes_stream()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
