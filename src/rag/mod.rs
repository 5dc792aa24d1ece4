// RAG (Retrieval-Augmented Generation) pipeline
//
// Components:
// - Retrieval: score corpus chunks against a query vector
// - Context Builder: render retrieved chunks into the prompt
// - Pipeline: question → context → completion stream

pub mod context;
pub mod pipeline;
pub mod retrieval;

// Re-export key types
pub use context::{ContextBuilder, ContextChunk};
pub use pipeline::{drain_answer, AnswerOutcome, PendingAnswer, QueryOrchestrator, SYSTEM_PROMPT};
pub use retrieval::{rank, RetrievalEngine, ScoredChunk};
