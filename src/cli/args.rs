//! Command-line argument parsing for ragterm
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ragterm - ask questions about a folder of PDF documents
#[derive(Parser, Debug)]
#[command(name = "ragterm")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Ask questions about your PDFs using local embeddings and any OpenAI-compatible model", long_about = None)]
pub struct Args {
    /// Question to answer once; starts the interactive loop when omitted
    #[arg(value_name = "QUESTION")]
    pub question: Option<String>,

    /// Folder containing the PDF documents
    #[arg(short, long, value_name = "DIR")]
    pub docs: Option<PathBuf>,

    /// Number of chunks passed to the model as context
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Words per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Completion model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// Completion service base URL (e.g. http://localhost:8080/v1)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Wait for the full answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Ignore the embedding cache and re-ingest the documents
    #[arg(long)]
    pub reindex: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only print answers and errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Re-ingest the document folder and rewrite the embedding cache
    Ingest,

    /// Delete the embedding cache
    Clean,

    /// Display the effective configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_some() && self.question.is_some() {
            return Err("Cannot ask a question together with a subcommand.".to_string());
        }

        if self.command.is_some() && self.reindex {
            return Err("--reindex only applies when asking questions.".to_string());
        }

        Ok(())
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default tracing filter for this verbosity
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "ragterm=info,warn",
            Verbosity::VeryVerbose => "ragterm=debug,info",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show retrieved sources and session summary
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
