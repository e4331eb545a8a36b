use rag_core::{normalize_text, Document, RetrievalError};
use std::sync::Arc;

use super::lexical::tokenize;
use super::retriever::{rank_top_k, ScoredDocument};

/// Text embedding capability used by the embedding retriever.
///
/// Implementations must be deterministic: identical text must map to an
/// identical vector, otherwise retrieval is not reproducible.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;

    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Cosine similarity; zero-length or zero-norm vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// Dense index caching one vector per document.
///
/// Vectors are computed once when a document is indexed and never
/// recomputed.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    documents: Vec<Arc<Document>>,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        tracing::info!(
            "Embedding index using model {} ({} dimensions)",
            embedder.model_name(),
            embedder.dimension()
        );

        Self {
            embedder,
            documents: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Embed and cache the given documents.
    ///
    /// Either every document is added or, on an embedder failure, none are.
    pub fn index(&mut self, documents: &[Arc<Document>]) -> Result<(), RetrievalError> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|doc| doc.text.clone()).collect();

        tracing::info!("Generating embeddings for batch of {} documents...", texts.len());
        let vectors = self.embedder.embed(&texts)?;

        if vectors.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        for vector in &vectors {
            self.check_dimension(vector)?;
        }

        self.documents.extend(documents.iter().cloned());
        self.vectors.extend(vectors);

        tracing::debug!("Embedding index now holds {} documents", self.documents.len());
        Ok(())
    }

    /// Embed the query once and rank every cached vector by cosine similarity
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>, RetrievalError> {
        if self.documents.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[normalize_text(query)])?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("Failed to generate embedding".to_string()))?;
        self.check_dimension(&query_vector)?;

        let scores = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, cosine_similarity(&query_vector, vector)))
            .collect();

        Ok(rank_top_k(&self.documents, scores, k))
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), RetrievalError> {
        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(RetrievalError::DimensionMismatch {
                expected,
                found: vector.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Feature-hashing bag-of-words embedder.
///
/// Needs no model download; useful offline and in tests. Each term is hashed
/// (FNV-1a) into one of `dimension` buckets with a hash-derived sign, then the
/// vector is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSION: usize = 256;

    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for term in tokenize(text) {
            let hash = fnv1a(term.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, &byte| {
        (hash ^ byte as u64).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how many texts were embedded
    struct CountingEmbedder {
        inner: HashingEmbedder,
        embedded: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed(texts)
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            Err(RetrievalError::Embedding("model unavailable".to_string()))
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    struct WrongDimensionEmbedder;

    impl Embedder for WrongDimensionEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "wrong-dimension"
        }
    }

    fn arc_docs(pairs: &[(&str, &str)]) -> Vec<Arc<Document>> {
        pairs
            .iter()
            .map(|(id, text)| Arc::new(Document::new(*id, *text).normalized()))
            .collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["vector search in rust".to_string(); 2];
        let vectors = embedder.embed(&texts).unwrap();

        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(vectors[0].len(), 64);
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_self_similarity_is_top() {
        let mut index = EmbeddingIndex::new(Arc::new(HashingEmbedder::default()));
        index
            .index(&arc_docs(&[
                ("1", "the quick brown fox"),
                ("2", "a lazy dog sleeps all day"),
                ("3", "brown bears eat fish"),
            ]))
            .unwrap();

        let results = index.retrieve("A lazy dog sleeps all day", 3).unwrap();
        assert_eq!(results[0].document.id, "2");
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_only_new_documents_are_embedded() {
        let embedder = Arc::new(CountingEmbedder {
            inner: HashingEmbedder::default(),
            embedded: AtomicUsize::new(0),
        });
        let mut index = EmbeddingIndex::new(embedder.clone());

        index.index(&arc_docs(&[("1", "one"), ("2", "two")])).unwrap();
        index.index(&arc_docs(&[("3", "three")])).unwrap();
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3);

        index.retrieve("two", 1).unwrap();
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 4);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_embedder_failure_leaves_index_unchanged() {
        let mut index = EmbeddingIndex::new(Arc::new(BrokenEmbedder));
        let err = index.index(&arc_docs(&[("1", "text")])).unwrap_err();

        assert!(matches!(err, RetrievalError::Embedding(_)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = EmbeddingIndex::new(Arc::new(WrongDimensionEmbedder));
        let err = index.index(&arc_docs(&[("1", "text")])).unwrap_err();

        assert_eq!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 3,
                found: 2
            }
        );
        assert!(index.is_empty());
    }

    #[test]
    fn test_empty_index_skips_query_embedding() {
        let index = EmbeddingIndex::new(Arc::new(BrokenEmbedder));
        assert!(index.retrieve("anything", 5).unwrap().is_empty());
    }
}
