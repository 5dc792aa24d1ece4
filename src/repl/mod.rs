//! Interactive question loop
//!
//! Reads questions, answers them against the corpus and keeps going after
//! failed or empty answers. `exit`, `quit` or end of input stop the loop.

pub mod display;
pub mod input;

use std::time::Instant;
use tracing::{debug, warn};

use crate::embedding::TextEmbedder;
use crate::errors::Result;
use crate::index::ChunkCorpus;
use crate::rag::{drain_answer, AnswerOutcome, QueryOrchestrator};
use crate::streaming::CompletionService;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

pub use display::DisplayManager;
pub use input::{InputHandler, UserInput};

/// Everything needed to answer questions
pub struct QuestionSession<'a, C: CompletionService> {
    orchestrator: &'a QueryOrchestrator<C>,
    embedder: &'a dyn TextEmbedder,
    corpus: &'a ChunkCorpus,
    display: &'a DisplayManager,
    telemetry: TelemetryCollector,
}

impl<'a, C: CompletionService> QuestionSession<'a, C> {
    pub fn new(
        orchestrator: &'a QueryOrchestrator<C>,
        embedder: &'a dyn TextEmbedder,
        corpus: &'a ChunkCorpus,
        display: &'a DisplayManager,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            orchestrator,
            embedder,
            corpus,
            display,
            telemetry,
        }
    }

    /// Answer one question, printing fragments as they arrive
    ///
    /// Never fails: errors become `AnswerOutcome::Failed`.
    pub async fn ask(&self, question: &str) -> AnswerOutcome {
        let started = Instant::now();

        let outcome = match self.orchestrator.ask(self.embedder, self.corpus, question).await {
            Ok(pending) => {
                self.telemetry.record(TelemetryEvent::QueryAsked {
                    retrieved: pending.sources.len(),
                    timestamp: Instant::now(),
                });
                self.display.show_sources(&pending.sources, &pending.scores);

                drain_answer(pending.fragments, |fragment| {
                    self.telemetry.record(TelemetryEvent::FragmentReceived {
                        bytes: fragment.len(),
                        timestamp: Instant::now(),
                    });
                    self.display.stream_fragment(fragment);
                })
                .await
            }
            Err(error) => {
                self.telemetry.record(TelemetryEvent::QueryAsked {
                    retrieved: 0,
                    timestamp: Instant::now(),
                });
                AnswerOutcome::Failed {
                    error,
                    partial: String::new(),
                }
            }
        };

        match &outcome {
            AnswerOutcome::Answered(_) => self.telemetry.record(TelemetryEvent::AnswerCompleted {
                duration_ms: started.elapsed().as_millis() as u64,
                timestamp: Instant::now(),
            }),
            AnswerOutcome::Empty => self.telemetry.record(TelemetryEvent::EmptyAnswer {
                timestamp: Instant::now(),
            }),
            AnswerOutcome::Failed { error, .. } => {
                warn!(error = %error, "Question failed");
                self.telemetry.record(TelemetryEvent::CompletionFailed {
                    reason: error.to_string(),
                    timestamp: Instant::now(),
                })
            }
        }

        self.display.show_outcome(&outcome);
        outcome
    }

    /// Read questions until the user leaves
    pub async fn run(&self, input: &mut InputHandler) -> Result<()> {
        loop {
            match input.read_input()? {
                UserInput::Exit => break,
                UserInput::Blank => continue,
                UserInput::Question(question) => {
                    debug!(question = %question, "Question received");
                    self.ask(&question).await;
                }
            }
        }

        if let Err(e) = input.save_history() {
            warn!(error = %e, "Could not save question history");
        }
        Ok(())
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }
}
