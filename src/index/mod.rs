//! Searchable index: the chunk corpus and its on-disk cache

pub mod cache;
pub mod corpus;

pub use cache::{CacheState, EmbeddingCache, CHUNKS_FILE, EMBEDDINGS_FILE};
pub use corpus::ChunkCorpus;
