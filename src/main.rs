//! ragterm - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use std::cell::RefCell;
use tracing_subscriber::EnvFilter;

use ragterm::{
    bootstrap::{Bootstrap, CorpusOrigin, IngestSettings},
    cli::{Args, Commands, Config, Verbosity},
    embedding::EmbeddingEngine,
    index::{ChunkCorpus, EmbeddingCache},
    ingest::PdfExtractor,
    rag::{AnswerOutcome, QueryOrchestrator, RetrievalEngine},
    rag::retrieval::SearchParams,
    repl::{DisplayManager, InputHandler, QuestionSession},
    streaming::CompletionClient,
    telemetry::{TelemetryCollector, TelemetryDisplay},
    RagError,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(message) = args.validate() {
        eprintln!("error: {}", message);
        std::process::exit(2);
    }

    init_tracing(args.verbosity());

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env();
    config.apply_args(&args);
    config.validate()?;

    let display = DisplayManager::new(args.verbosity());

    match &args.command {
        Some(Commands::Config) => show_config(&config)?,
        Some(Commands::Clean) => clean_cache(&config, &display)?,
        Some(Commands::Ingest) => {
            let telemetry = TelemetryCollector::new();
            if let Some((_, corpus)) = prepare(&config, &display, &telemetry, true)? {
                display.show_success(&format!(
                    "Indexed {} chunks from {} documents",
                    corpus.len(),
                    corpus.source_count()
                ));
            }
        }
        None => run(&args, &config, &display).await?,
    }

    Ok(())
}

/// `RUST_LOG` wins over the verbosity flags
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(args: &Args, config: &Config, display: &DisplayManager) -> Result<()> {
    let telemetry = TelemetryCollector::new();

    let Some((embedder, corpus)) = prepare(config, display, &telemetry, args.reindex)? else {
        return Ok(());
    };

    let client = CompletionClient::with_config(
        &config.completion.base_url,
        &config.completion.api_key,
        &config.completion.model,
        config.response_mode(),
        config.timeout(),
    )?;
    let retrieval = RetrievalEngine::with_params(SearchParams {
        top_k: config.retrieval.top_k,
    });
    let orchestrator = QueryOrchestrator::with_retrieval(client, retrieval);
    let session = QuestionSession::new(&orchestrator, &embedder, &corpus, display, telemetry.clone());

    if let Some(question) = &args.question {
        let outcome = session.ask(question).await;
        TelemetryDisplay::new(telemetry, display.verbosity()).display_summary();
        if matches!(outcome, AnswerOutcome::Failed { .. }) {
            std::process::exit(1);
        }
        return Ok(());
    }

    display.show_banner(env!("CARGO_PKG_VERSION"), &config.completion.model, corpus.len());

    let mut input = match history_path() {
        Some(path) => InputHandler::with_history(path)?,
        None => InputHandler::new()?,
    };
    session.run(&mut input).await?;

    TelemetryDisplay::new(telemetry, display.verbosity()).display_summary();
    Ok(())
}

/// Load the encoder and the corpus
///
/// Returns `None` when the folder holds nothing to index; the user has been
/// told and the process should end normally.
fn prepare(
    config: &Config,
    display: &DisplayManager,
    telemetry: &TelemetryCollector,
    force: bool,
) -> Result<Option<(EmbeddingEngine, ChunkCorpus)>> {
    let spinner = display.spinner(&format!("Loading embedding model {}", config.embedding.model));
    let embedder = EmbeddingEngine::load(&config.embedding.model)
        .with_context(|| format!("Failed to load embedding model '{}'", config.embedding.model))?;
    spinner.finish_and_clear();

    let settings = IngestSettings {
        folder: config.documents.folder.clone(),
        chunk_size: config.chunk_size()?,
        batch_size: config.embedding.batch_size,
    };
    let extractor = PdfExtractor;
    let bootstrap = Bootstrap::new(settings, EmbeddingCache::new(&config.cache.dir), &extractor)
        .with_telemetry(telemetry.clone());

    let progress: RefCell<Option<ProgressBar>> = RefCell::new(None);
    let result = bootstrap.prepare(
        &embedder,
        force,
        &mut |total| *progress.borrow_mut() = Some(display.embedding_progress(total)),
        &mut |done| {
            if let Some(pb) = progress.borrow().as_ref() {
                pb.inc(done as u64);
            }
        },
    );
    if let Some(pb) = progress.borrow_mut().take() {
        pb.finish_and_clear();
    }

    match result {
        Ok((corpus, origin)) => {
            match origin {
                CorpusOrigin::Cache => display.show_info(&format!(
                    "Loaded {} cached chunks from {}",
                    corpus.len(),
                    bootstrap.cache().dir().display()
                )),
                CorpusOrigin::Ingested => display.show_success(&format!(
                    "Embedded {} chunks from {}",
                    corpus.len(),
                    bootstrap.folder().display()
                )),
            }
            Ok(Some((embedder, corpus)))
        }
        Err(RagError::IngestionEmpty { folder }) => {
            display.show_warning(&format!(
                "No text found in PDF documents under {}. Add some PDFs and try again.",
                folder.display()
            ));
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn clean_cache(config: &Config, display: &DisplayManager) -> Result<()> {
    let cache = EmbeddingCache::new(&config.cache.dir);
    if cache.clear()? {
        display.show_success(&format!("Removed embedding cache in {}", cache.dir().display()));
    } else {
        display.show_info("No embedding cache to remove");
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    if let Some(path) = Config::default_path() {
        println!("# {}", path.display());
    }
    println!("{}", config.to_display_toml()?);
    Ok(())
}

fn history_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|home| home.join(".ragterm").join("history"))
}
