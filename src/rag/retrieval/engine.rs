// Retrieval: rank corpus chunks against a query vector
use serde::{Deserialize, Serialize};

use crate::embedding::dot;
use crate::errors::{RagError, Result};
use crate::index::ChunkCorpus;
use crate::types::Chunk;

/// Default number of chunks handed to the model
pub const DEFAULT_TOP_K: usize = 5;

/// Cosine similarities are reported on a 0–100 scale
pub const SCORE_SCALE: f32 = 100.0;

/// Search parameters for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum number of results to retrieve
    pub top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// A corpus chunk with its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk<'a> {
    pub score: f32,
    pub chunk: &'a Chunk,
}

/// Rank every chunk in `corpus` against `query` and keep the best `k`
///
/// Score is `100 × dot(query, row)`, which is a scaled cosine similarity
/// because both sides are unit length. Results are sorted by descending
/// score; equal scores keep corpus order.
pub fn rank<'a>(query: &[f32], corpus: &'a ChunkCorpus, k: usize) -> Result<Vec<ScoredChunk<'a>>> {
    if corpus.is_empty() || k == 0 {
        return Ok(Vec::new());
    }
    if query.len() != corpus.dim() {
        return Err(RagError::DimensionMismatch {
            expected: corpus.dim(),
            actual: query.len(),
        });
    }

    let mut scored: Vec<ScoredChunk<'a>> = corpus
        .iter()
        .map(|(chunk, row)| ScoredChunk {
            score: SCORE_SCALE * dot(query, row),
            chunk,
        })
        .collect();

    // sort_by is stable, so ties stay in corpus order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);

    Ok(scored)
}

/// Retrieval engine holding default search parameters
#[derive(Debug, Clone, Default)]
pub struct RetrievalEngine {
    default_params: SearchParams,
}

impl RetrievalEngine {
    /// Create new retrieval engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom default parameters
    pub fn with_params(params: SearchParams) -> Self {
        Self {
            default_params: params,
        }
    }

    /// Rank with the default parameters
    pub fn retrieve<'a>(&self, query: &[f32], corpus: &'a ChunkCorpus) -> Result<Vec<ScoredChunk<'a>>> {
        rank(query, corpus, self.default_params.top_k)
    }

    /// Get default search parameters
    pub fn default_params(&self) -> &SearchParams {
        &self.default_params
    }
}
