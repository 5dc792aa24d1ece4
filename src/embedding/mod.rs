//! Embeddings: text in, unit-length vectors out
//!
//! Documents are embedded as-is. Queries are wrapped in an instruction
//! template first, which instruction-tuned encoders require; mixing the two
//! framings puts queries and documents in different distributions.

pub mod engine;
pub mod matrix;

pub use engine::{EmbeddingEngine, DEFAULT_MODEL_ID, MAX_SEQUENCE_LENGTH};
pub use matrix::{dot, l2_norm, EmbeddingMatrix};

use crate::errors::{RagError, Result};

/// Task description placed in front of every query
pub const QUERY_INSTRUCTION: &str = "Given a user question, retrieve relevant context to answer it.";

/// Wrap a user question in the instruction template
pub fn frame_query(query: &str) -> String {
    format!("Instruct: {}\nQuery: {}", QUERY_INSTRUCTION, query)
}

/// Anything that maps texts to L2-normalized vectors
pub trait TextEmbedder {
    /// Embed `texts` in one invocation; row `i` belongs to `texts[i]`
    fn embed(&self, texts: &[&str]) -> Result<EmbeddingMatrix>;

    /// Row length this embedder produces, when known before embedding
    fn expected_dim(&self) -> Option<usize> {
        None
    }

    /// Embed a user question with instruction framing
    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let framed = frame_query(query);
        let matrix = self.embed(&[framed.as_str()])?;
        matrix
            .row(0)
            .map(<[f32]>::to_vec)
            .ok_or_else(|| RagError::Embedding("Embedder returned no row for query".to_string()))
    }

    /// Embed document texts in batches of at most `batch_size`
    ///
    /// `on_batch` receives the number of texts finished after each batch.
    fn embed_documents(
        &self,
        texts: &[&str],
        batch_size: usize,
        on_batch: &mut dyn FnMut(usize),
    ) -> Result<EmbeddingMatrix> {
        let mut matrix = EmbeddingMatrix::new();

        for batch in texts.chunks(batch_size.max(1)) {
            let rows = self.embed(batch)?;
            if rows.rows() != batch.len() {
                return Err(RagError::CorpusMismatch {
                    chunks: batch.len(),
                    rows: rows.rows(),
                });
            }
            matrix.append(rows)?;
            on_batch(batch.len());
        }

        Ok(matrix)
    }
}
