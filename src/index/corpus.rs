//! Chunk corpus: chunks paired 1:1 with embedding rows

use crate::embedding::EmbeddingMatrix;
use crate::errors::{RagError, Result};
use crate::types::Chunk;

/// Chunks and their embeddings, kept in the same index space
///
/// Row `i` of the matrix is the embedding of chunk `i`. The pairing is
/// checked on construction and nothing mutates one side alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkCorpus {
    chunks: Vec<Chunk>,
    embeddings: EmbeddingMatrix,
}

impl ChunkCorpus {
    pub fn new(chunks: Vec<Chunk>, embeddings: EmbeddingMatrix) -> Result<Self> {
        if chunks.len() != embeddings.rows() {
            return Err(RagError::CorpusMismatch {
                chunks: chunks.len(),
                rows: embeddings.rows(),
            });
        }
        Ok(Self { chunks, embeddings })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn embeddings(&self) -> &EmbeddingMatrix {
        &self.embeddings
    }

    /// Embedding dimension (0 for an empty corpus)
    pub fn dim(&self) -> usize {
        self.embeddings.dim()
    }

    /// Chunks alongside their embedding rows, in corpus order
    pub fn iter(&self) -> impl Iterator<Item = (&Chunk, &[f32])> {
        self.chunks.iter().zip(self.embeddings.iter_rows())
    }

    /// Number of distinct source documents
    pub fn source_count(&self) -> usize {
        let mut sources: Vec<&str> = self.chunks.iter().map(|c| c.source_id.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        sources.len()
    }

    pub fn into_parts(self) -> (Vec<Chunk>, EmbeddingMatrix) {
        (self.chunks, self.embeddings)
    }
}
