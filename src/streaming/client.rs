//! OpenAI-compatible chat/completions client
//!
//! Provides answer text as a lazy stream of fragments:
//! - Endpoint: POST {base_url}/chat/completions
//! - Streaming: server-sent events with `choices[0].delta.content`
//! - Non-streaming: one JSON body with `choices[0].message.content`
//!
//! Both modes produce the same [`AnswerStream`] type, so callers never
//! special-case streaming.

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

use crate::errors::{RagError, Result};
use crate::streaming::parser::{SseEvent, SseParser};
use crate::types::ChatMessage;

/// Default completion endpoint
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";

/// Default completion model
pub const DEFAULT_MODEL: &str = "Qwen2.5 0.5B";

/// Default API key (local servers ignore it)
pub const DEFAULT_API_KEY: &str = "sk-dummy";

/// Default request timeout
///
/// Bounds connecting and a whole non-streaming answer. A streamed answer may
/// run longer; it only fails when the server goes quiet for this long.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Lazy, finite sequence of answer fragments
///
/// Not restartable. Dropping it stops reading; the server is not notified.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// How the service delivers the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Fragments arrive as the model produces them
    Streaming,
    /// One fragment once the full answer is ready
    Batch,
}

impl ResponseMode {
    pub fn from_stream_flag(stream: bool) -> Self {
        if stream {
            ResponseMode::Streaming
        } else {
            ResponseMode::Batch
        }
    }

    pub fn is_streaming(self) -> bool {
        self == ResponseMode::Streaming
    }
}

/// A chat completion backend
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send `messages` and return the answer as a fragment stream
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<AnswerStream>;
}

/// HTTP client for an OpenAI-compatible server
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    mode: ResponseMode,
    timeout: Duration,
}

impl CompletionClient {
    /// Create client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(
            DEFAULT_BASE_URL,
            DEFAULT_API_KEY,
            DEFAULT_MODEL,
            ResponseMode::Streaming,
            DEFAULT_TIMEOUT,
        )
    }

    /// Create client with custom configuration
    pub fn with_config(
        base_url: &str,
        api_key: &str,
        model: &str,
        mode: ResponseMode,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(RagError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            mode,
            timeout,
        })
    }

    /// Full chat/completions URL
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<AnswerStream> {
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: self.mode.is_streaming(),
        };

        debug!(url = %self.endpoint(), model = %self.model, stream = request.stream, "Sending completion request");

        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request);
        if !self.mode.is_streaming() {
            builder = builder.timeout(self.timeout);
        }

        // Waits for the response head only; a streamed body has its own idle limit
        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| {
                RagError::Completion(format!("No response within {}s", self.timeout.as_secs()))
            })?
            .map_err(|e| RagError::Completion(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::Completion(format!("HTTP {}: {}", status, error_text)));
        }

        match self.mode {
            ResponseMode::Streaming => Ok(sse_fragments(response.bytes_stream(), self.timeout)),
            ResponseMode::Batch => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| RagError::Completion(format!("Failed to read response: {}", e)))?;
                let content = parse_message_content(&body)?;
                Ok(Box::pin(stream::once(async move { Ok::<_, RagError>(content) })))
            }
        }
    }
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// Non-streaming response body
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One streamed chunk
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract `choices[0].message.content`; a null content is an empty answer
pub fn parse_message_content(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| RagError::Completion(format!("Malformed response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| RagError::Completion("Response contained no choices".to_string()))
}

/// Extract `choices[0].delta.content` from one stream event
///
/// Role-only and finish-reason chunks carry no content and yield `None`.
pub fn parse_delta_content(data: &str) -> Result<Option<String>> {
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| RagError::Completion(format!("Malformed stream chunk: {}", e)))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    idle_timeout: Duration,
    parser: SseParser,
    pending: VecDeque<String>,
    finished: bool,
}

impl<S> SseState<S> {
    /// Queue the content of parsed events; returns true once the stream is over
    fn absorb(&mut self, events: Vec<SseEvent>) -> Result<bool> {
        for event in events {
            match event {
                SseEvent::Data(data) => {
                    if let Some(content) = parse_delta_content(&data)? {
                        self.pending.push_back(content);
                    }
                }
                SseEvent::Done => return Ok(true),
            }
        }
        Ok(false)
    }
}

/// Turn a raw byte stream of server-sent events into answer fragments
///
/// Ends at the `[DONE]` sentinel or when the byte stream closes. The first
/// transport or parse error is yielded and ends the stream, as is a gap of
/// more than `idle_timeout` between two reads. There is no limit on the
/// total length of the answer.
pub fn sse_fragments<S, B, E>(bytes: S, idle_timeout: Duration) -> AnswerStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        idle_timeout,
        parser: SseParser::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }

            let next = tokio::time::timeout(state.idle_timeout, state.bytes.next()).await;
            let events = match next {
                Err(_) => Err(RagError::Streaming(format!(
                    "No data from server for {}s",
                    state.idle_timeout.as_secs_f32()
                ))),
                Ok(Some(Ok(chunk))) => state.parser.add_bytes(chunk.as_ref()),
                Ok(Some(Err(e))) => Err(RagError::Streaming(e.to_string())),
                Ok(None) => {
                    state.finished = true;
                    Ok(state.parser.finish())
                }
            };

            match events.and_then(|events| state.absorb(events)) {
                Ok(done) => state.finished |= done,
                Err(e) => {
                    state.finished = true;
                    state.pending.clear();
                    return Some((Err(e), state));
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const IDLE: Duration = Duration::from_secs(5);

    fn byte_stream(
        parts: Vec<&'static str>,
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + 'static {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
    }

    async fn collect(stream: AnswerStream) -> Vec<Result<String>> {
        stream.collect().await
    }

    #[test]
    fn test_client_creation() {
        let client = CompletionClient::new().unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert_eq!(client.mode(), ResponseMode::Streaming);
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = CompletionClient::with_config(
            "http://localhost:9999/v1/",
            "key",
            "m",
            ResponseMode::Batch,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn test_parse_message_content() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"42"}}]}"#;
        assert_eq!(parse_message_content(body).unwrap(), "42");
    }

    #[test]
    fn test_parse_message_null_content_is_empty() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(parse_message_content(body).unwrap(), "");
    }

    #[test]
    fn test_parse_message_without_choices_is_error() {
        assert!(parse_message_content(r#"{"choices":[]}"#).is_err());
        assert!(parse_message_content("not json").is_err());
    }

    #[test]
    fn test_parse_delta_content() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_delta_content(data).unwrap(), Some("Hel".to_string()));

        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_delta_content(role_only).unwrap(), None);

        let finish = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_delta_content(finish).unwrap(), None);
    }

    #[tokio::test]
    async fn test_sse_fragments_until_done() {
        let bytes = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choi",
            "ces\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ]);

        let fragments: Vec<String> = collect(sse_fragments(bytes, IDLE))
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_sse_fragments_end_on_close() {
        let bytes = byte_stream(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}"]);
        let results = collect(sse_fragments(bytes, IDLE)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), "x");
    }

    #[tokio::test]
    async fn test_sse_malformed_chunk_is_error() {
        let bytes = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
            "data: {oops\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n",
        ]);
        let results = collect(sse_fragments(bytes, IDLE)).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "ok");
        assert!(matches!(results[1], Err(RagError::Completion(_))));
    }

    #[tokio::test]
    async fn test_sse_transport_error() {
        let bytes = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let results = collect(sse_fragments(bytes, IDLE)).await;

        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(RagError::Streaming(_))));
    }

    #[tokio::test]
    async fn test_sse_empty_stream() {
        let results = collect(sse_fragments(byte_stream(vec!["data: [DONE]\n\n"]), IDLE)).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_sse_silent_server_times_out() {
        let bytes = byte_stream(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n"])
            .chain(stream::pending());
        let results = collect(sse_fragments(bytes, Duration::from_millis(50))).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "a");
        assert!(matches!(results[1], Err(RagError::Streaming(_))));
    }
}
