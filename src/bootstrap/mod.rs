//! Startup for ragterm
//!
//! Produces the searchable corpus: reuse the embedding cache when it holds a
//! complete snapshot, otherwise ingest the document folder, embed every chunk
//! and store the result.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::embedding::TextEmbedder;
use crate::errors::{RagError, Result};
use crate::index::{ChunkCorpus, EmbeddingCache};
use crate::ingest::{build_corpus, ingest_folder, TextExtractor};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};

/// Where the corpus came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusOrigin {
    Cache,
    Ingested,
}

/// Ingestion settings
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub folder: PathBuf,
    pub chunk_size: NonZeroUsize,
    pub batch_size: usize,
}

/// Corpus preparation
pub struct Bootstrap<'a> {
    settings: IngestSettings,
    cache: EmbeddingCache,
    extractor: &'a dyn TextExtractor,
    telemetry: Option<TelemetryCollector>,
}

impl<'a> Bootstrap<'a> {
    pub fn new(settings: IngestSettings, cache: EmbeddingCache, extractor: &'a dyn TextExtractor) -> Self {
        Self {
            settings,
            cache,
            extractor,
            telemetry: None,
        }
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn folder(&self) -> &Path {
        &self.settings.folder
    }

    /// Cached corpus when present, else a fresh one
    ///
    /// `force` skips the cache. `on_total` is told the chunk count before
    /// embedding starts and `on_batch` how many chunks each batch finished.
    pub fn prepare(
        &self,
        embedder: &dyn TextEmbedder,
        force: bool,
        on_total: &mut dyn FnMut(usize),
        on_batch: &mut dyn FnMut(usize),
    ) -> Result<(ChunkCorpus, CorpusOrigin)> {
        if !force {
            if let Some(corpus) = self.cache.load()? {
                match embedder.expected_dim() {
                    Some(dim) if dim != corpus.dim() => {
                        warn!(
                            cached = corpus.dim(),
                            model = dim,
                            "Cached embeddings come from a different model, re-ingesting"
                        );
                    }
                    _ => {
                        info!(chunks = corpus.len(), dir = %self.cache.dir().display(), "Using cached embeddings");
                        self.record(TelemetryEvent::CacheHit {
                            chunks: corpus.len(),
                            timestamp: Instant::now(),
                        });
                        return Ok((corpus, CorpusOrigin::Cache));
                    }
                }
            }
        }

        let corpus = self.ingest(embedder, on_total, on_batch)?;
        Ok((corpus, CorpusOrigin::Ingested))
    }

    /// Ingest the folder, embed it and overwrite the cache
    pub fn ingest(
        &self,
        embedder: &dyn TextEmbedder,
        on_total: &mut dyn FnMut(usize),
        on_batch: &mut dyn FnMut(usize),
    ) -> Result<ChunkCorpus> {
        let folder = &self.settings.folder;
        let chunks = ingest_folder(folder, self.extractor, self.settings.chunk_size)?;

        if chunks.is_empty() {
            return Err(RagError::IngestionEmpty {
                folder: folder.clone(),
            });
        }

        let chunk_count = chunks.len();
        on_total(chunk_count);
        let started = Instant::now();
        let corpus = build_corpus(chunks, embedder, self.settings.batch_size, on_batch)?;

        self.record(TelemetryEvent::DocumentsIngested {
            documents: corpus.source_count(),
            chunks: chunk_count,
            timestamp: Instant::now(),
        });
        self.record(TelemetryEvent::ChunksEmbedded {
            chunks: chunk_count,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Instant::now(),
        });

        // A failed write only costs a re-embed next time
        if let Err(e) = self.cache.save(&corpus) {
            warn!(error = %e, dir = %self.cache.dir().display(), "Could not write embedding cache");
        }

        Ok(corpus)
    }

    fn record(&self, event: TelemetryEvent) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(event);
        }
    }
}
