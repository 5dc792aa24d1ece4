//! End-to-end retrieval pipeline without the encoder model
//!
//! Documents are plain-text fixtures named `.pdf` and vectors come from a
//! keyword embedder, so every expected ranking can be worked out by hand.

mod common;

use std::fs;
use std::num::NonZeroUsize;
use std::time::Duration;

use common::{delta, serve_once, sse_response, words, KeywordEmbedder, PlainTextExtractor};
use ragterm::bootstrap::{Bootstrap, CorpusOrigin, IngestSettings};
use ragterm::embedding::{EmbeddingMatrix, TextEmbedder};
use ragterm::index::{ChunkCorpus, EmbeddingCache};
use ragterm::ingest::{build_corpus, ingest_folder};
use ragterm::rag::{drain_answer, rank, AnswerOutcome, QueryOrchestrator};
use ragterm::streaming::{CompletionClient, ResponseMode};
use ragterm::types::Chunk;
use ragterm::RagError;
use tempfile::TempDir;

fn size(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn test_600_word_document_gives_two_chunks() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("report.pdf"), words("w", 600)).unwrap();

    let chunks = ingest_folder(dir.path(), &PlainTextExtractor, size(300)).unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].label(), "report.pdf [chunk 0]");
    assert_eq!(chunks[1].label(), "report.pdf [chunk 1]");
    assert_eq!(chunks[0].text.split(' ').count(), 300);
    assert!(chunks[0].text.starts_with("w0 w1"));
    assert!(chunks[1].text.starts_with("w300 "));
    assert!(chunks[1].text.ends_with(" w599"));
}

#[test]
fn test_non_pdf_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), words("t", 10)).unwrap();
    fs::write(dir.path().join("UPPER.PDF"), words("u", 10)).unwrap();
    fs::create_dir(dir.path().join("nested.pdf")).unwrap();

    let chunks = ingest_folder(dir.path(), &PlainTextExtractor, size(300)).unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].source_id, "UPPER.PDF");
}

#[test]
fn test_empty_folder_stops_before_questions() {
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("documents");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("blank.pdf"), "   \n\t ").unwrap();

    let settings = IngestSettings {
        folder: folder.clone(),
        chunk_size: size(300),
        batch_size: 16,
    };
    let bootstrap = Bootstrap::new(settings, EmbeddingCache::new(dir.path()), &PlainTextExtractor);
    let embedder = KeywordEmbedder {
        keywords: vec!["x"],
    };

    match bootstrap.prepare(&embedder, false, &mut |_| {}, &mut |_| {}) {
        Err(RagError::IngestionEmpty { folder: reported }) => assert_eq!(reported, folder),
        other => panic!("expected IngestionEmpty, got {:?}", other.map(|(c, _)| c.len())),
    }
}

#[test]
fn test_three_chunk_ranking() {
    let corpus = ChunkCorpus::new(
        vec![
            Chunk::new("d.pdf", 0, "a"),
            Chunk::new("d.pdf", 1, "b"),
            Chunk::new("d.pdf", 2, "c"),
        ],
        EmbeddingMatrix::from_rows(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.6, 0.8, 0.0],
        ])
        .unwrap(),
    )
    .unwrap();

    let ranked = rank(&[0.0, 1.0, 0.0], &corpus, 2).unwrap();

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].chunk.sequence_index, 1);
    assert!((ranked[0].score - 100.0).abs() < 1e-4);
    assert_eq!(ranked[1].chunk.sequence_index, 2);
    assert!((ranked[1].score - 80.0).abs() < 1e-4);
}

#[test]
fn test_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("documents");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("a.pdf"), "rust ownership borrowing lifetimes").unwrap();
    fs::write(folder.join("b.pdf"), "python garbage collection").unwrap();

    let embedder = KeywordEmbedder {
        keywords: vec!["rust", "python"],
    };
    let settings = IngestSettings {
        folder,
        chunk_size: size(300),
        batch_size: 1,
    };

    let first_run = Bootstrap::new(settings.clone(), EmbeddingCache::new(dir.path()), &PlainTextExtractor);
    let (fresh, origin) = first_run.prepare(&embedder, false, &mut |_| {}, &mut |_| {}).unwrap();
    assert_eq!(origin, CorpusOrigin::Ingested);

    let second_run = Bootstrap::new(settings, EmbeddingCache::new(dir.path()), &PlainTextExtractor);
    let (cached, origin) = second_run.prepare(&embedder, false, &mut |_| {}, &mut |_| {}).unwrap();
    assert_eq!(origin, CorpusOrigin::Cache);
    assert_eq!(cached.chunks(), fresh.chunks());

    let query = embedder.embed_query("Tell me about rust").unwrap();
    let ranked = rank(&query, &cached, 5).unwrap();
    assert_eq!(ranked[0].chunk.source_id, "a.pdf");
}

#[tokio::test]
async fn test_question_to_answer() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("animals.pdf"),
        format!("{} cats purr softly {}", words("pad", 3), words("tail", 3)),
    )
    .unwrap();
    fs::write(dir.path().join("machines.pdf"), "engines need fuel and oil").unwrap();

    let embedder = KeywordEmbedder {
        keywords: vec!["cats", "engines"],
    };
    let chunks = ingest_folder(dir.path(), &PlainTextExtractor, size(4)).unwrap();
    let corpus = build_corpus(chunks, &embedder, 2, &mut |_| {}).unwrap();

    let (base_url, request) = serve_once(sse_response(&[&delta("They purr."), "[DONE]"])).await;
    let client = CompletionClient::with_config(
        &base_url,
        "sk-test",
        "test-model",
        ResponseMode::Streaming,
        Duration::from_secs(5),
    )
    .unwrap();
    let orchestrator = QueryOrchestrator::new(client);

    let pending = orchestrator.ask(&embedder, &corpus, "What do cats do?").await.unwrap();
    assert_eq!(pending.sources[0], "animals.pdf [chunk 0]");
    assert!(pending.sources.len() <= 5);

    let outcome = drain_answer(pending.fragments, |_| {}).await;
    assert!(matches!(outcome, AnswerOutcome::Answered(ref a) if a == "They purr."));

    let body = request.await.unwrap().body;
    let prompt = body["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.starts_with("Context:\n[animals.pdf [chunk 0]]\npad0 pad1 pad2 cats"));
    assert!(prompt.ends_with("\n\nQuestion: What do cats do?"));
}
