//! Ingestion: document folder → chunks → embedded corpus

pub mod chunker;
pub mod extract;

pub use chunker::{chunk_text, DEFAULT_CHUNK_SIZE};
pub use extract::{PdfExtractor, TextExtractor};

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::embedding::TextEmbedder;
use crate::errors::Result;
use crate::index::ChunkCorpus;
use crate::types::Chunk;

/// Documents in `folder` the extractor accepts, sorted by file name
pub fn list_documents(folder: &Path, extractor: &dyn TextExtractor) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && extractor.accepts(&path) {
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents)
}

/// Chunk every document in `folder`
///
/// Documents that fail extraction or contain no words contribute zero
/// chunks; they are logged and skipped. An empty result is not an error here.
pub fn ingest_folder(
    folder: &Path,
    extractor: &dyn TextExtractor,
    chunk_size: NonZeroUsize,
) -> Result<Vec<Chunk>> {
    let documents = list_documents(folder, extractor)?;
    let mut chunks = Vec::new();

    for path in &documents {
        let source_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let text = match extractor.extract(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(document = %source_id, error = %e, "Skipping document");
                continue;
            }
        };

        let windows = chunk_text(&text, chunk_size);
        if windows.is_empty() {
            warn!(document = %source_id, "No extractable text");
            continue;
        }

        debug!(document = %source_id, chunks = windows.len(), "Chunked document");
        chunks.extend(
            windows
                .into_iter()
                .enumerate()
                .map(|(index, window)| Chunk::new(source_id.clone(), index, window)),
        );
    }

    info!(
        folder = %folder.display(),
        documents = documents.len(),
        chunks = chunks.len(),
        "Ingestion finished"
    );
    Ok(chunks)
}

/// Embed `chunks` and pair them with their vectors
pub fn build_corpus(
    chunks: Vec<Chunk>,
    embedder: &dyn TextEmbedder,
    batch_size: usize,
    on_batch: &mut dyn FnMut(usize),
) -> Result<ChunkCorpus> {
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let embeddings = embedder.embed_documents(&texts, batch_size, on_batch)?;
    ChunkCorpus::new(chunks, embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingMatrix;
    use crate::errors::RagError;
    use tempfile::TempDir;

    /// Treats `.pdf` files as plain UTF-8 text
    struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn accepts(&self, path: &Path) -> bool {
            extract::has_extension(path, "pdf")
        }

        fn extract(&self, path: &Path) -> Result<String> {
            let text = fs::read_to_string(path)?;
            if text.starts_with("%BROKEN") {
                return Err(RagError::Extraction {
                    path: path.to_path_buf(),
                    reason: "corrupt".to_string(),
                });
            }
            Ok(text)
        }
    }

    struct ConstantEmbedder;

    impl TextEmbedder for ConstantEmbedder {
        fn embed(&self, texts: &[&str]) -> Result<EmbeddingMatrix> {
            EmbeddingMatrix::from_rows(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_empty_folder_yields_no_chunks() {
        let dir = TempDir::new().unwrap();
        let chunks = ingest_folder(dir.path(), &PlainTextExtractor, size(300)).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_missing_folder_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = ingest_folder(&dir.path().join("nope"), &PlainTextExtractor, size(300));
        assert!(matches!(result, Err(RagError::Io(_))));
    }

    #[test]
    fn test_sequence_indices_restart_per_document() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.pdf"), "one two three").unwrap();
        fs::write(dir.path().join("a.pdf"), "four five six seven").unwrap();
        fs::write(dir.path().join("ignored.txt"), "not a pdf").unwrap();

        let chunks = ingest_folder(dir.path(), &PlainTextExtractor, size(2)).unwrap();
        let ids: Vec<(&str, usize)> = chunks.iter().map(Chunk::id).collect();

        assert_eq!(
            ids,
            vec![("a.pdf", 0), ("a.pdf", 1), ("b.pdf", 0), ("b.pdf", 1)]
        );
        assert_eq!(chunks[0].text, "four five");
    }

    #[test]
    fn test_bad_and_blank_documents_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.pdf"), "%BROKEN").unwrap();
        fs::write(dir.path().join("blank.pdf"), "   \n ").unwrap();
        fs::write(dir.path().join("good.pdf"), "some real words").unwrap();

        let chunks = ingest_folder(dir.path(), &PlainTextExtractor, size(10)).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source_id, "good.pdf");
    }

    #[test]
    fn test_build_corpus_pairs_every_chunk() {
        let chunks = vec![Chunk::new("a.pdf", 0, "x"), Chunk::new("a.pdf", 1, "y")];
        let mut done = 0;
        let corpus = build_corpus(chunks, &ConstantEmbedder, 1, &mut |n| done += n).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.dim(), 2);
        assert_eq!(done, 2);
    }
}
