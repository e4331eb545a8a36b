use rag_core::{Document, RetrievalError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::embedding::EmbeddingIndex;
use super::lexical::LexicalIndex;

/// A retrieved document with its relevance score
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Arc<Document>,
    pub score: f32,
    /// Insertion index of the document in the retriever, used for tie-breaks
    pub position: usize,
}

/// Which ranking function a retriever uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrieverKind {
    /// BM25 over term statistics
    #[default]
    Lexical,
    /// Cosine similarity over dense embeddings
    Embedding,
}

impl fmt::Display for RetrieverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieverKind::Lexical => write!(f, "bm25"),
            RetrieverKind::Embedding => write!(f, "embedding"),
        }
    }
}

impl FromStr for RetrieverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bm25" | "lexical" => Ok(RetrieverKind::Lexical),
            "embedding" | "dense" => Ok(RetrieverKind::Embedding),
            other => Err(format!(
                "unknown retriever '{}' (expected bm25, lexical, embedding or dense)",
                other
            )),
        }
    }
}

/// Retriever over an additive document index.
///
/// The variant is fixed at construction; an embedding failure never falls
/// back to lexical scoring.
pub enum Retriever {
    Lexical(LexicalIndex),
    Embedding(EmbeddingIndex),
}

impl Retriever {
    pub fn kind(&self) -> RetrieverKind {
        match self {
            Retriever::Lexical(_) => RetrieverKind::Lexical,
            Retriever::Embedding(_) => RetrieverKind::Embedding,
        }
    }

    /// Add new documents to the index. Previously indexed documents are not
    /// touched.
    pub fn index(&mut self, documents: &[Arc<Document>]) -> Result<(), RetrievalError> {
        match self {
            Retriever::Lexical(index) => {
                index.index(documents);
                Ok(())
            }
            Retriever::Embedding(index) => index.index(documents),
        }
    }

    /// Return up to `k` documents ordered by descending score
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>, RetrievalError> {
        if k == 0 {
            return Err(RetrievalError::InvalidTopK);
        }

        match self {
            Retriever::Lexical(index) => Ok(index.retrieve(query, k)),
            Retriever::Embedding(index) => index.retrieve(query, k),
        }
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        match self {
            Retriever::Lexical(index) => index.len(),
            Retriever::Embedding(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pick the `k` best `(position, score)` pairs: descending score, lower
/// insertion position first on ties.
pub(crate) fn rank_top_k(
    documents: &[Arc<Document>],
    scores: Vec<(usize, f32)>,
    k: usize,
) -> Vec<ScoredDocument> {
    let mut scores = scores;
    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scores.truncate(k);

    scores
        .into_iter()
        .map(|(position, score)| ScoredDocument {
            document: Arc::clone(&documents[position]),
            score,
            position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriever_kind_parsing() {
        assert_eq!("BM25".parse::<RetrieverKind>().unwrap(), RetrieverKind::Lexical);
        assert_eq!("lexical".parse::<RetrieverKind>().unwrap(), RetrieverKind::Lexical);
        assert_eq!(
            "embedding".parse::<RetrieverKind>().unwrap(),
            RetrieverKind::Embedding
        );
        assert_eq!("Dense".parse::<RetrieverKind>().unwrap(), RetrieverKind::Embedding);
        assert!("tfidf".parse::<RetrieverKind>().is_err());
    }

    #[test]
    fn test_retriever_kind_display_round_trips() {
        for kind in [RetrieverKind::Lexical, RetrieverKind::Embedding] {
            assert_eq!(kind.to_string().parse::<RetrieverKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_default_kind_is_lexical() {
        assert_eq!(RetrieverKind::default(), RetrieverKind::Lexical);
    }

    #[test]
    fn test_rank_top_k_tie_break_by_position() {
        let documents: Vec<Arc<Document>> = (0..4)
            .map(|i| Arc::new(Document::new(i.to_string(), "x")))
            .collect();

        let ranked = rank_top_k(&documents, vec![(0, 0.5), (1, 0.9), (2, 0.5), (3, 0.9)], 3);

        let ids: Vec<&str> = ranked.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "0"]);
    }

    #[test]
    fn test_zero_k_rejected() {
        let retriever = Retriever::Lexical(LexicalIndex::default());
        assert_eq!(
            retriever.retrieve("anything", 0).unwrap_err(),
            RetrievalError::InvalidTopK
        );
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let retriever = Retriever::Lexical(LexicalIndex::default());
        assert!(retriever.retrieve("anything", 5).unwrap().is_empty());
        assert!(retriever.is_empty());
    }
}
