// Query orchestration: question + retrieved context → answer stream
use futures_util::StreamExt;
use tracing::{debug, info};

use crate::embedding::TextEmbedder;
use crate::errors::{RagError, Result};
use crate::index::ChunkCorpus;
use crate::rag::context::{ContextBuilder, ContextChunk};
use crate::rag::retrieval::RetrievalEngine;
use crate::streaming::{AnswerStream, CompletionService};
use crate::types::ChatMessage;

/// System instruction sent with every question
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the provided context to answer the question.";

/// An answer in flight, with the chunks it was grounded on
pub struct PendingAnswer {
    /// Labels of the context chunks, most relevant first
    pub sources: Vec<String>,
    /// Ranking scores matching `sources`
    pub scores: Vec<f32>,
    /// The answer fragments
    pub fragments: AnswerStream,
}

/// How a question ended
#[derive(Debug)]
pub enum AnswerOutcome {
    /// The service produced text
    Answered(String),
    /// The call succeeded but returned no content
    Empty,
    /// The call failed; `partial` holds anything received first
    Failed { error: RagError, partial: String },
}

impl AnswerOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, AnswerOutcome::Answered(_))
    }
}

/// Composes context and delegates to the completion service
pub struct QueryOrchestrator<C: CompletionService> {
    service: C,
    context_builder: ContextBuilder,
    retrieval: RetrievalEngine,
}

impl<C: CompletionService> QueryOrchestrator<C> {
    /// Create an orchestrator with default retrieval parameters
    pub fn new(service: C) -> Self {
        Self::with_retrieval(service, RetrievalEngine::new())
    }

    pub fn with_retrieval(service: C, retrieval: RetrievalEngine) -> Self {
        Self {
            service,
            context_builder: ContextBuilder::new(),
            retrieval,
        }
    }

    /// Chat messages for `query` grounded on `context_chunks`
    pub fn build_messages(&self, query: &str, context_chunks: &[ContextChunk]) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(self.context_builder.augment_prompt(query, context_chunks)),
        ]
    }

    /// Ask the completion service, grounded on `context_chunks` in the given order
    pub async fn answer(&self, query: &str, context_chunks: &[ContextChunk]) -> Result<AnswerStream> {
        let messages = self.build_messages(query, context_chunks);
        debug!(context_chunks = context_chunks.len(), "Requesting answer");
        self.service.complete(messages).await
    }

    /// Embed the question, rank the corpus and ask for an answer
    pub async fn ask(
        &self,
        embedder: &dyn TextEmbedder,
        corpus: &ChunkCorpus,
        query: &str,
    ) -> Result<PendingAnswer> {
        let query_vector = embedder.embed_query(query)?;
        let ranked = self.retrieval.retrieve(&query_vector, corpus)?;

        info!(
            retrieved = ranked.len(),
            best_score = ?ranked.first().map(|s| s.score),
            "Retrieved context"
        );

        let context_chunks: Vec<ContextChunk> = ranked.iter().map(ContextChunk::from).collect();
        let fragments = self.answer(query, &context_chunks).await?;

        Ok(PendingAnswer {
            sources: context_chunks.into_iter().map(|c| c.label).collect(),
            scores: ranked.iter().map(|s| s.score).collect(),
            fragments,
        })
    }

    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }
}

/// Consume an answer stream, handing each fragment to `on_fragment`
///
/// Whitespace-only answers count as empty.
pub async fn drain_answer<F>(mut fragments: AnswerStream, mut on_fragment: F) -> AnswerOutcome
where
    F: FnMut(&str),
{
    let mut answer = String::new();

    while let Some(item) = fragments.next().await {
        match item {
            Ok(fragment) => {
                on_fragment(&fragment);
                answer.push_str(&fragment);
            }
            Err(error) => {
                return AnswerOutcome::Failed {
                    error,
                    partial: answer,
                }
            }
        }
    }

    if answer.trim().is_empty() {
        AnswerOutcome::Empty
    } else {
        AnswerOutcome::Answered(answer)
    }
}
