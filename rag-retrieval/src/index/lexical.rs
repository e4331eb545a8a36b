use rag_core::{normalize_text, Document};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::retriever::{rank_top_k, ScoredDocument};

/// BM25 tuning constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f32,
    /// Document length normalization (0 = none, 1 = full)
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Split text into lower-cased alphanumeric terms
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Incremental BM25 (Okapi) index.
///
/// Corpus statistics (document count, document frequencies, average length)
/// grow as documents are added; per-document term counts are computed once.
#[derive(Debug, Default)]
pub struct LexicalIndex {
    params: Bm25Params,
    documents: Vec<Arc<Document>>,
    term_counts: Vec<HashMap<String, u32>>,
    lengths: Vec<usize>,
    document_frequency: HashMap<String, usize>,
    total_length: usize,
}

impl LexicalIndex {
    pub fn new(params: Bm25Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Add documents to the index
    pub fn index(&mut self, documents: &[Arc<Document>]) {
        for document in documents {
            let terms = tokenize(&document.text);

            let mut counts: HashMap<String, u32> = HashMap::new();
            for term in &terms {
                *counts.entry(term.clone()).or_insert(0) += 1;
            }
            for term in counts.keys() {
                *self.document_frequency.entry(term.clone()).or_insert(0) += 1;
            }

            self.total_length += terms.len();
            self.lengths.push(terms.len());
            self.term_counts.push(counts);
            self.documents.push(Arc::clone(document));
        }

        tracing::debug!(
            "Lexical index now holds {} documents ({} distinct terms)",
            self.documents.len(),
            self.document_frequency.len()
        );
    }

    /// Score every indexed document and return the top `k`
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<ScoredDocument> {
        if self.documents.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let query_terms: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|term| seen.insert(term.clone()))
            .collect();

        let scores = (0..self.documents.len())
            .map(|position| (position, self.score(position, &query_terms)))
            .collect();

        rank_top_k(&self.documents, scores, k)
    }

    /// Inverse document frequency, kept non-negative for very common terms
    fn idf(&self, term: &str) -> f32 {
        let n = self.documents.len() as f32;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score(&self, position: usize, query_terms: &[String]) -> f32 {
        let Bm25Params { k1, b } = self.params;
        let counts = &self.term_counts[position];
        let length = self.lengths[position] as f32;
        let avg_length = (self.total_length as f32 / self.documents.len() as f32).max(1.0);

        query_terms
            .iter()
            .filter_map(|term| counts.get(term).map(|&tf| (term, tf as f32)))
            .map(|(term, tf)| {
                let norm = k1 * (1.0 - b + b * length / avg_length);
                self.idf(term) * tf * (k1 + 1.0) / (tf + norm)
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
