//! Telemetry system for ragterm
//!
//! Collects session events (ingestion, cache use, questions, answers) and
//! renders a summary when the session ends.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::cli::Verbosity;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Startup events
    DocumentsIngested {
        documents: usize,
        chunks: usize,
        timestamp: Instant,
    },
    ChunksEmbedded {
        chunks: usize,
        duration_ms: u64,
        timestamp: Instant,
    },
    CacheHit {
        chunks: usize,
        timestamp: Instant,
    },

    // Question events
    QueryAsked {
        retrieved: usize,
        timestamp: Instant,
    },
    FragmentReceived {
        bytes: usize,
        timestamp: Instant,
    },
    AnswerCompleted {
        duration_ms: u64,
        timestamp: Instant,
    },
    EmptyAnswer {
        timestamp: Instant,
    },
    CompletionFailed {
        reason: String,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryStats {
    pub documents_ingested: usize,
    pub chunks_indexed: usize,
    pub cache_hits: usize,
    pub embedding_ms: u64,
    pub questions_asked: usize,
    pub answers_completed: usize,
    pub empty_answers: usize,
    pub failed_answers: usize,
    pub fragments_received: usize,
    pub answer_bytes: usize,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

/// Lock a mutex, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::DocumentsIngested {
                    documents, chunks, ..
                } => {
                    stats.documents_ingested += documents;
                    stats.chunks_indexed = *chunks;
                }
                TelemetryEvent::ChunksEmbedded { duration_ms, .. } => {
                    stats.embedding_ms += duration_ms;
                }
                TelemetryEvent::CacheHit { chunks, .. } => {
                    stats.cache_hits += 1;
                    stats.chunks_indexed = *chunks;
                }
                TelemetryEvent::QueryAsked { .. } => {
                    stats.questions_asked += 1;
                }
                TelemetryEvent::FragmentReceived { bytes, .. } => {
                    stats.fragments_received += 1;
                    stats.answer_bytes += bytes;
                }
                TelemetryEvent::AnswerCompleted { .. } => {
                    stats.answers_completed += 1;
                }
                TelemetryEvent::EmptyAnswer { .. } => {
                    stats.empty_answers += 1;
                }
                TelemetryEvent::CompletionFailed { .. } => {
                    stats.failed_answers += 1;
                }
            }
        }

        lock(&self.events).push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Share of questions that produced a non-empty answer
    pub fn answer_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        if stats.questions_asked == 0 {
            1.0
        } else {
            stats.answers_completed as f64 / stats.questions_asked as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: Verbosity,
}

impl TelemetryDisplay {
    /// Create a new display
    pub fn new(collector: TelemetryCollector, verbosity: Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Render summary statistics
    pub fn summary(&self) -> String {
        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();
        let source = if stats.cache_hits > 0 {
            "cache"
        } else {
            "fresh ingest"
        };

        let mut out = String::new();
        out.push_str("\nSession Summary\n");
        out.push_str("─────────────────────────────────────\n");
        out.push_str(&format!("Duration:          {:.1?}\n", elapsed));
        out.push_str(&format!("Chunks indexed:    {} ({})\n", stats.chunks_indexed, source));
        if stats.documents_ingested > 0 {
            out.push_str(&format!("Documents read:    {}\n", stats.documents_ingested));
            out.push_str(&format!("Embedding time:    {} ms\n", stats.embedding_ms));
        }
        out.push_str(&format!("Questions:         {}\n", stats.questions_asked));
        out.push_str(&format!(
            "Answered:          {:.1}%\n",
            self.collector.answer_rate() * 100.0
        ));
        out.push_str(&format!("Empty answers:     {}\n", stats.empty_answers));
        out.push_str(&format!("Failed answers:    {}\n", stats.failed_answers));
        out.push_str(&format!("Fragments:         {}\n", stats.fragments_received));
        out
    }

    /// Print the summary when the session is verbose
    pub fn display_summary(&self) {
        if self.should_show_details() {
            println!("{}", self.summary().bright_black());
        }
    }

    /// Check if should show detailed output
    pub fn should_show_details(&self) -> bool {
        self.verbosity.show_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_creation() {
        let collector = TelemetryCollector::new();
        assert_eq!(collector.event_count(), 0);
        assert_eq!(collector.get_stats(), TelemetryStats::default());
    }

    #[test]
    fn test_record_fragment_event() {
        let collector = TelemetryCollector::new();
        collector.record(TelemetryEvent::FragmentReceived {
            bytes: 5,
            timestamp: Instant::now(),
        });

        let stats = collector.get_stats();
        assert_eq!(stats.fragments_received, 1);
        assert_eq!(stats.answer_bytes, 5);
        assert_eq!(collector.event_count(), 1);
    }

    #[test]
    fn test_startup_events() {
        let collector = TelemetryCollector::new();
        collector.record(TelemetryEvent::DocumentsIngested {
            documents: 2,
            chunks: 7,
            timestamp: Instant::now(),
        });
        collector.record(TelemetryEvent::ChunksEmbedded {
            chunks: 7,
            duration_ms: 40,
            timestamp: Instant::now(),
        });

        let stats = collector.get_stats();
        assert_eq!(stats.documents_ingested, 2);
        assert_eq!(stats.chunks_indexed, 7);
        assert_eq!(stats.embedding_ms, 40);
        assert_eq!(stats.cache_hits, 0);
    }

    #[test]
    fn test_answer_rate() {
        let collector = TelemetryCollector::new();
        assert_eq!(collector.answer_rate(), 1.0);

        for _ in 0..3 {
            collector.record(TelemetryEvent::QueryAsked {
                retrieved: 5,
                timestamp: Instant::now(),
            });
        }
        collector.record(TelemetryEvent::AnswerCompleted {
            duration_ms: 10,
            timestamp: Instant::now(),
        });
        collector.record(TelemetryEvent::AnswerCompleted {
            duration_ms: 10,
            timestamp: Instant::now(),
        });
        collector.record(TelemetryEvent::CompletionFailed {
            reason: "timeout".to_string(),
            timestamp: Instant::now(),
        });

        assert!((collector.answer_rate() - 0.666).abs() < 0.01);
        assert_eq!(collector.get_stats().failed_answers, 1);
    }

    #[test]
    fn test_recent_events() {
        let collector = TelemetryCollector::new();
        for _ in 0..10 {
            collector.record(TelemetryEvent::EmptyAnswer {
                timestamp: Instant::now(),
            });
        }

        assert_eq!(collector.recent_events(3).len(), 3);
        assert_eq!(collector.recent_events(30).len(), 10);
    }

    #[test]
    fn test_summary_mentions_cache() {
        let collector = TelemetryCollector::new();
        collector.record(TelemetryEvent::CacheHit {
            chunks: 12,
            timestamp: Instant::now(),
        });
        let display = TelemetryDisplay::new(collector, Verbosity::Verbose);

        let summary = display.summary();
        assert!(summary.contains("Chunks indexed:    12 (cache)"));
        assert!(!summary.contains("Documents read"));
        assert!(display.should_show_details());
    }
}
