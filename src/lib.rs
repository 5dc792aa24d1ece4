//! ragterm - ask questions about a folder of PDF documents
//!
//! Documents are split into word windows, embedded with a local encoder
//! model and cached on disk. Each question is embedded, the closest chunks
//! are ranked and handed to an OpenAI-compatible completion service as
//! context.
//!
//! # Architecture
//!
//! - **ingest**: PDF text extraction and chunking
//! - **embedding**: candle encoder, pooling and normalization
//! - **index**: chunk corpus and its on-disk cache
//! - **rag**: ranking, context assembly and query orchestration
//! - **streaming**: completion client and SSE parsing
//! - **cli / repl / bootstrap / telemetry**: the terminal application

pub mod errors;
pub mod types;

// Retrieval core
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod rag;
pub mod streaming;

// Application layer
pub mod bootstrap;
pub mod cli;
pub mod repl;
pub mod telemetry;

// Re-export commonly used types
pub use errors::{RagError, Result};
pub use index::ChunkCorpus;
pub use types::Chunk;
