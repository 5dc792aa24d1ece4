// Context builder: retrieved chunks → grounding text for the prompt
use serde::{Deserialize, Serialize};

use crate::rag::retrieval::ScoredChunk;

/// Separator placed between chunks in the context block
pub const CHUNK_DELIMITER: &str = "\n---\n";

/// A labelled piece of context, in ranking order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub label: String,
    pub text: String,
}

impl ContextChunk {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

impl From<&ScoredChunk<'_>> for ContextChunk {
    fn from(scored: &ScoredChunk<'_>) -> Self {
        Self {
            label: scored.chunk.label(),
            text: scored.chunk.text.clone(),
        }
    }
}

/// Assembled context for prompt augmentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    /// The formatted context text
    pub text: String,
    /// Labels of the chunks included, most relevant first
    pub labels: Vec<String>,
}

/// Builds the context block and the user message
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render each chunk as `[label]\ntext`, joined by [`CHUNK_DELIMITER`]
    pub fn build(&self, chunks: &[ContextChunk]) -> AssembledContext {
        let text = chunks
            .iter()
            .map(|c| format!("[{}]\n{}", c.label, c.text))
            .collect::<Vec<_>>()
            .join(CHUNK_DELIMITER);

        AssembledContext {
            text,
            labels: chunks.iter().map(|c| c.label.clone()).collect(),
        }
    }

    /// User message carrying the context and the question
    pub fn augment_prompt(&self, query: &str, chunks: &[ContextChunk]) -> String {
        let context = self.build(chunks);
        format!("Context:\n{}\n\nQuestion: {}", context.text, query)
    }
}
