//! Query metrics
//!
//! Tracks per-query latency and retrieval quality:
//! - Retrieval latency (scoring, plus query embedding for the dense variant)
//! - Generation latency
//! - Score distribution of the context documents

use std::time::{Duration, Instant};

/// Metrics for one `query` call
#[derive(Debug, Clone, Default)]
pub struct QueryMetrics {
    /// Time spent retrieving and assembling the prompt (milliseconds)
    pub retrieval_latency_ms: u64,

    /// Time spent waiting on the generator (milliseconds)
    pub generation_latency_ms: u64,

    /// Scores of the context documents, in prompt order
    pub scores: Vec<f32>,

    pub score_min: Option<f32>,

    pub score_max: Option<f32>,

    /// Number of documents placed in the prompt context
    pub num_context_documents: usize,

    /// Prompt length in characters
    pub prompt_chars: usize,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_retrieval_latency(&mut self, duration: Duration) {
        self.retrieval_latency_ms = duration.as_millis() as u64;
    }

    pub fn set_generation_latency(&mut self, duration: Duration) {
        self.generation_latency_ms = duration.as_millis() as u64;
    }

    /// Record context scores and compute min/max
    pub fn set_scores(&mut self, scores: Vec<f32>) {
        self.score_min = scores.iter().copied().reduce(f32::min);
        self.score_max = scores.iter().copied().reduce(f32::max);
        self.num_context_documents = scores.len();
        self.scores = scores;
    }

    pub fn avg_score(&self) -> f32 {
        if self.scores.is_empty() {
            0.0
        } else {
            self.scores.iter().sum::<f32>() / self.scores.len() as f32
        }
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.retrieval_latency_ms + self.generation_latency_ms
    }

    /// Report metrics to tracing logs
    pub fn report(&self) {
        tracing::info!(
            "Query metrics: retrieval={}ms, generation={}ms, total={}ms, context_docs={}, avg_score={:.3}, score_range=[{:?},{:?}], prompt_chars={}",
            self.retrieval_latency_ms,
            self.generation_latency_ms,
            self.total_latency_ms(),
            self.num_context_documents,
            self.avg_score(),
            self.score_min,
            self.score_max,
            self.prompt_chars,
        );
    }
}

/// Timer helper for measuring operation latency
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return elapsed duration
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}
