// Retrieval Engine Module
pub mod engine;

pub use engine::{rank, RetrievalEngine, ScoredChunk, SearchParams, DEFAULT_TOP_K, SCORE_SCALE};
