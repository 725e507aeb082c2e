//! HTTP Graph Engine - Implementation of ResponseEngine over HTTP.
//!
//! Posts the message input to a graph-execution server and reads its event
//! stream back as Server-Sent Events.
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpEngineConfig::new("http://localhost:2024")
//!     .with_stream_path("/runs/stream")
//!     .with_timeout(Duration::from_secs(120));
//!
//! let engine = HttpGraphEngine::new(config)?;
//! ```
//!
//! # Streaming
//!
//! Each SSE event carries one JSON engine event in its `data:` field.
//! Multi-line `data:` fields are joined with `\n`, comment lines are
//! skipped, and a `[DONE]` payload ends the stream even if the server keeps
//! the body open. Lines may be split across network chunks; the decoder
//! buffers until a full line arrives. The first error also ends the stream.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::domain::relay::{EngineEvent, EngineInput};
use crate::ports::{EngineError, EngineEventStream, ResponseEngine};

/// Configuration for the HTTP graph engine.
#[derive(Debug, Clone)]
pub struct HttpEngineConfig {
    /// Base URL of the engine server.
    pub base_url: String,
    /// Path of the streaming endpoint, appended to `base_url`.
    pub stream_path: String,
    /// Optional bearer token.
    api_key: Option<Secret<String>>,
    /// Whole-request timeout, including the streamed body.
    pub timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl HttpEngineConfig {
    /// Creates a configuration pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            stream_path: "/stream".to_string(),
            api_key: None,
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the streaming endpoint path.
    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    /// Sets the bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    /// Sets the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl From<&EngineConfig> for HttpEngineConfig {
    fn from(config: &EngineConfig) -> Self {
        let mut engine = HttpEngineConfig::new(config.base_url.clone())
            .with_stream_path(config.stream_path.clone())
            .with_timeout(config.timeout())
            .with_connect_timeout(config.connect_timeout());
        engine.api_key = config.api_key.clone();
        engine
    }
}

/// Response engine backed by a remote graph-execution server.
pub struct HttpGraphEngine {
    client: Client,
    config: HttpEngineConfig,
}

#[derive(Serialize)]
struct StreamRequest<'a> {
    input: &'a EngineInput,
}

impl HttpGraphEngine {
    /// Creates a new engine client.
    pub fn new(config: HttpEngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| EngineError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.stream_path
        )
    }

    /// Sends the streaming request.
    async fn send_streaming_request(&self, input: &EngineInput) -> Result<Response, EngineError> {
        let mut request = self
            .client
            .post(self.stream_url())
            .header("Accept", "text/event-stream")
            .json(&StreamRequest { input });

        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        request.send().await.map_err(|e| self.map_transport_error(e))
    }

    /// Maps non-success statuses to errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(EngineError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> EngineError {
        if e.is_timeout() {
            EngineError::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else if e.is_connect() {
            EngineError::network(format!("Connection failed: {}", e))
        } else {
            EngineError::network(e.to_string())
        }
    }
}

#[async_trait]
impl ResponseEngine for HttpGraphEngine {
    async fn stream_events(&self, input: EngineInput) -> Result<EngineEventStream, EngineError> {
        let response = self.send_streaming_request(&input).await?;
        let response = self.handle_response_status(response).await?;

        let timeout_secs = self.config.timeout.as_secs();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| body_error(e, timeout_secs)));

        Ok(sse_events(body))
    }
}

fn body_error(e: reqwest::Error, timeout_secs: u64) -> EngineError {
    if e.is_timeout() {
        EngineError::Timeout { timeout_secs }
    } else {
        EngineError::network(format!("Stream error: {}", e))
    }
}

/// Decodes an SSE body into engine events.
///
/// The stream ends at `[DONE]`, at the end of the body, or right after the
/// first error. Dropping it drops the body, which closes the request.
fn sse_events<S, B>(body: S) -> EngineEventStream
where
    S: Stream<Item = Result<B, EngineError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        decoder: SseDecoder::default(),
        ready: VecDeque::new(),
        failed: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                if item.is_err() {
                    state.ready.clear();
                    state.failed = true;
                }
                return Some((item, state));
            }

            if state.failed || state.decoder.is_done() {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.ready.extend(events);
                }
                Some(Err(e)) => {
                    state.failed = true;
                    return Some((Err(e), state));
                }
                None => return None,
            }
        }
    }))
}

struct SseState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    /// Decoded events not yet yielded.
    ready: VecDeque<Result<EngineEvent, EngineError>>,
    failed: bool,
}

/// Incremental Server-Sent Events decoder.
#[derive(Debug, Default)]
struct SseDecoder {
    /// Bytes received after the last complete line.
    pending: Vec<u8>,
    /// `data:` lines of the event being assembled.
    data: Vec<String>,
    /// Set once `[DONE]` is seen; later input is ignored.
    done: bool,
}

impl SseDecoder {
    /// Feeds one network chunk, returning every event it completes.
    fn push(&mut self, chunk: &[u8]) -> Vec<Result<EngineEvent, EngineError>> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.pending.extend_from_slice(chunk);

        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                if self.done {
                    self.pending.clear();
                    break;
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }

        events
    }

    fn is_done(&self) -> bool {
        self.done
    }

    /// Completes the current event, if it carried any data.
    fn dispatch(&mut self) -> Option<Result<EngineEvent, EngineError>> {
        if self.data.is_empty() {
            return None;
        }

        let payload = self.data.join("\n");
        self.data.clear();

        if payload.trim() == "[DONE]" {
            self.done = true;
            return None;
        }

        Some(
            serde_json::from_str::<EngineEvent>(&payload)
                .map_err(|e| EngineError::decode(format!("{}: {}", e, payload))),
        )
    }
}
