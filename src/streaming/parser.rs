//! Incremental server-sent-events parser
//!
//! Accumulates raw bytes from the completion stream and yields complete
//! events:
//! - Buffer: 1MB maximum for a single unfinished line
//! - Events end at a blank line; multiple `data:` lines are joined with `\n`
//! - `data: [DONE]` is the end-of-stream sentinel

use crate::errors::{RagError, Result};

/// Maximum buffer size (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Sentinel payload closing an OpenAI-style stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A complete event extracted from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of one event
    Data(String),
    /// The server signalled completion
    Done,
}

/// Incremental SSE parser
#[derive(Debug)]
pub struct SseParser {
    /// Bytes of the current, not yet terminated line
    buffer: Vec<u8>,

    /// `data:` lines of the event being assembled
    data_lines: Vec<String>,

    /// Maximum buffer size
    max_buffer_size: usize,
}

impl SseParser {
    /// Create new parser with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create parser with custom buffer capacity
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            data_lines: Vec::new(),
            max_buffer_size,
        }
    }

    /// Add bytes and return every event they complete
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>> {
        let mut events = Vec::new();

        for &byte in bytes {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.buffer);
                self.process_line(&line, &mut events);
                continue;
            }

            if self.buffer.len() >= self.max_buffer_size {
                return Err(RagError::Streaming(format!(
                    "Buffer overflow: line exceeds maximum {} bytes",
                    self.max_buffer_size
                )));
            }
            self.buffer.push(byte);
        }

        Ok(events)
    }

    /// Flush whatever is left when the connection closes
    ///
    /// Servers may close without the trailing blank line.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();

        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.process_line(&line, &mut events);
        }
        self.dispatch(&mut events);

        events
    }

    fn process_line(&mut self, line: &[u8], events: &mut Vec<SseEvent>) {
        let line = String::from_utf8_lossy(line);
        let line = line.strip_suffix('\r').unwrap_or(&line);

        if line.is_empty() {
            self.dispatch(events);
            return;
        }

        // Comment / keep-alive
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        // event:, id: and retry: carry nothing we use
        if field == "data" {
            self.data_lines.push(value.to_string());
        }
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        if self.data_lines.is_empty() {
            return;
        }

        let data = self.data_lines.join("\n");
        self.data_lines.clear();

        if data.trim() == DONE_SENTINEL {
            events.push(SseEvent::Done);
        } else {
            events.push(SseEvent::Data(data));
        }
    }

    /// Get current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.data_lines.is_empty()
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.data_lines.clear();
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}
