//! Terminal output for ragterm
//!
//! Banner, ingestion progress, streamed answers and outcome notices.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::cli::Verbosity;
use crate::rag::AnswerOutcome;

/// Display manager for terminal UI
pub struct DisplayManager {
    verbosity: Verbosity,
    update_interval: Duration,
}

impl DisplayManager {
    pub fn new(verbosity: Verbosity) -> Self {
        DisplayManager {
            verbosity,
            update_interval: Duration::from_millis(100),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, model: &str, chunks: usize) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        let width = 64;
        let title = format!("  ragterm {} - Ask your documents", version);
        let info = format!("  Model: {} | Chunks: {}", model, chunks);

        println!("\n{}", "=".repeat(width).cyan());
        println!("{}", title.bold().cyan());
        println!("{}", info.dimmed());
        println!("{}\n", "=".repeat(width).cyan());
        println!(
            "Type your question (or {} / {} to leave)\n",
            "exit".green(),
            "quit".green()
        );
    }

    /// Progress bar for embedding `total` chunks; hidden in quiet mode
    pub fn embedding_progress(&self, total: usize) -> ProgressBar {
        if !self.verbosity.show_progress() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} Embedding [{bar:40.cyan/blue}] {pos}/{len} chunks | ETA: {eta}")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.enable_steady_tick(self.update_interval);
        pb
    }

    /// Spinner shown while the encoder model loads
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.verbosity.show_progress() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(self.update_interval);
        pb
    }

    /// Print one answer fragment as it arrives
    pub fn stream_fragment(&self, fragment: &str) {
        print!("{}", fragment);
        let _ = io::stdout().flush();
    }

    /// List the chunks an answer was grounded on (verbose only)
    pub fn show_sources(&self, sources: &[String], scores: &[f32]) {
        if !self.verbosity.show_events() || sources.is_empty() {
            return;
        }
        println!("{}", "Sources:".dimmed());
        for (label, score) in sources.iter().zip(scores) {
            println!("  {} {}", format!("{:6.2}", score).dimmed(), label.dimmed());
        }
    }

    /// Close out an answer after streaming
    pub fn show_outcome(&self, outcome: &AnswerOutcome) {
        println!();
        match outcome {
            AnswerOutcome::Answered(_) => {}
            AnswerOutcome::Empty => self.show_warning(&empty_answer_notice()),
            AnswerOutcome::Failed { error, partial } => {
                if !partial.is_empty() {
                    println!();
                }
                self.show_error(&failure_notice(&error.to_string()));
            }
        }
        println!();
    }

    pub fn show_success(&self, message: &str) {
        if self.verbosity != Verbosity::Quiet {
            println!("{} {}", "✓".green(), message);
        }
    }

    pub fn show_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error.red());
    }

    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    pub fn show_info(&self, info: &str) {
        if self.verbosity != Verbosity::Quiet {
            println!("{} {}", "Info:".cyan(), info);
        }
    }
}

/// Notice for a call that succeeded with nothing to say
pub fn empty_answer_notice() -> String {
    "The model returned no answer. Try rephrasing the question.".to_string()
}

/// Notice for a failed call; the session goes on
pub fn failure_notice(reason: &str) -> String {
    format!("Could not get an answer: {}", reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_are_distinct() {
        let empty = empty_answer_notice();
        let failed = failure_notice("connection refused");

        assert!(empty.contains("rephrasing"));
        assert!(!empty.contains("connection refused"));
        assert!(failed.ends_with("connection refused"));
    }

    #[test]
    fn test_quiet_mode_hides_progress() {
        let display = DisplayManager::new(Verbosity::Quiet);
        assert!(display.embedding_progress(10).is_hidden());
        assert!(display.spinner("Loading").is_hidden());
    }

    #[test]
    fn test_progress_length() {
        let display = DisplayManager::new(Verbosity::Normal);
        let pb = display.embedding_progress(42);
        assert_eq!(pb.length(), Some(42));
        pb.finish_and_clear();
    }
}
