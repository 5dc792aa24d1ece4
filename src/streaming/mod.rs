//! Streaming client module
//!
//! Provides the completion client and the incremental SSE parser.

pub mod client;
pub mod parser;

// Re-export commonly used types
pub use client::{
    sse_fragments, AnswerStream, CompletionClient, CompletionService, ResponseMode,
    DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use parser::{SseEvent, SseParser, MAX_BUFFER_SIZE};
