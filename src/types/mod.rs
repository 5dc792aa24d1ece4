//! Type definitions module
//!
//! Core data types shared by ingestion, retrieval and completion.

pub mod chunk;
pub mod messages;

// Re-export commonly used types
pub use chunk::Chunk;
pub use messages::{ChatMessage, Role};
