//! Chunk type: the unit of retrieval

use serde::{Deserialize, Serialize};

/// A contiguous word window taken from one source document
///
/// Identity is `(source_id, sequence_index)`. Chunks are created during
/// ingestion and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Originating document (its file name)
    pub source_id: String,
    /// Position of this window within its document, starting at 0
    pub sequence_index: usize,
    /// Window words joined by single spaces
    pub text: String,
}

impl Chunk {
    pub fn new(source_id: impl Into<String>, sequence_index: usize, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            sequence_index,
            text: text.into(),
        }
    }

    /// Human-readable label, e.g. `manual.pdf [chunk 3]`
    pub fn label(&self) -> String {
        format!("{} [chunk {}]", self.source_id, self.sequence_index)
    }

    /// Identity key
    pub fn id(&self) -> (&str, usize) {
        (&self.source_id, self.sequence_index)
    }
}
