use rag_core::{Document, PipelineError};
use rag_retrieval::{
    Bm25Params, DocumentStore, Embedder, EmbeddingIndex, LexicalIndex, Retriever, RetrieverKind,
    ScoredDocument,
};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::llm::{Generator, MetricsTimer, PromptBuilder, QueryMetrics};

/// Configuration for the RAG pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of context documents retrieved when the caller gives no `k`
    pub top_k: usize,

    /// Ranking parameters for the lexical retriever
    pub bm25: Bm25Params,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            bm25: Bm25Params::default(),
        }
    }
}

/// Lifecycle state of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No documents indexed yet
    Empty,
    /// At least one document indexed
    Ready,
}

/// Outcome of one `load_documents` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub documents_added: usize,
    pub total_documents: usize,
}

/// Full result of a query: the answer plus what produced it
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub answer: String,
    pub context: Vec<ScoredDocument>,
    pub prompt: String,
    pub metrics: QueryMetrics,
}

/// Store and retriever change together under one lock
struct Corpus {
    store: DocumentStore,
    retriever: Retriever,
}

/// Retrieval-augmented generation pipeline
///
/// 1. `load_documents` validates and normalizes a batch, indexes only the new
///    documents, then commits them to the store
/// 2. `query` retrieves the top-k documents, builds the prompt and calls the
///    generator
///
/// Loading takes the write lock for its whole duration. Queries hold the read
/// lock only while retrieving and building the prompt, never across the
/// generator call. Nothing is retried.
pub struct RagPipeline<G> {
    config: PipelineConfig,
    corpus: RwLock<Corpus>,
    generator: G,
}

impl<G: Generator> RagPipeline<G> {
    /// Pipeline ranking documents with BM25
    pub fn lexical(config: PipelineConfig, generator: G) -> Self {
        let retriever = Retriever::Lexical(LexicalIndex::new(config.bm25));
        Self::with_retriever(config, retriever, generator)
    }

    /// Pipeline ranking documents by embedding cosine similarity
    pub fn embedding(config: PipelineConfig, embedder: Arc<dyn Embedder>, generator: G) -> Self {
        let retriever = Retriever::Embedding(EmbeddingIndex::new(embedder));
        Self::with_retriever(config, retriever, generator)
    }

    /// Pipeline over an explicitly constructed retriever.
    ///
    /// The retriever must not have indexed anything yet: the store starts
    /// empty and the two are kept in lockstep from here on.
    pub fn with_retriever(config: PipelineConfig, retriever: Retriever, generator: G) -> Self {
        tracing::info!(
            "Initializing RAG pipeline: retriever={}, generator={}, top_k={}",
            retriever.kind(),
            generator.name(),
            config.top_k
        );

        Self {
            config,
            corpus: RwLock::new(Corpus {
                store: DocumentStore::new(),
                retriever,
            }),
            generator,
        }
    }

    /// Add a batch of documents.
    ///
    /// Atomic: on a validation or indexing error neither the store nor the
    /// index changes.
    pub fn load_documents<I>(&self, documents: I) -> Result<LoadStats, PipelineError>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut corpus = self.corpus.write().map_err(|_| PipelineError::Poisoned)?;
        let Corpus { store, retriever } = &mut *corpus;

        let batch = store.prepare(documents).map_err(|e| {
            tracing::warn!("Rejected document batch: {}", e);
            PipelineError::from(e)
        })?;

        retriever.index(batch.documents()).map_err(|e| {
            tracing::error!("Failed to index document batch: {}", e);
            PipelineError::from(e)
        })?;

        let added = store.commit(batch)?;

        let stats = LoadStats {
            documents_added: added.len(),
            total_documents: store.len(),
        };
        tracing::info!(
            "Loaded {} documents (total: {})",
            stats.documents_added,
            stats.total_documents
        );

        Ok(stats)
    }

    /// Answer a query using the configured default `top_k`
    pub async fn query(&self, text: &str) -> Result<String, PipelineError> {
        self.query_with_k(text, self.config.top_k).await
    }

    /// Answer a query using the `k` best documents as context
    pub async fn query_with_k(&self, text: &str, k: usize) -> Result<String, PipelineError> {
        Ok(self.query_with_metrics(text, k).await?.answer)
    }

    /// Answer a query and return the context, prompt and timings alongside
    pub async fn query_with_metrics(
        &self,
        text: &str,
        k: usize,
    ) -> Result<QueryResponse, PipelineError> {
        let mut metrics = QueryMetrics::new();

        let timer = MetricsTimer::start();
        let (context, prompt) = self.retrieve_and_build(text, k).map_err(|e| {
            tracing::error!("Error during query retrieval: {}", e);
            e
        })?;
        metrics.set_retrieval_latency(timer.stop());
        metrics.set_scores(context.iter().map(|r| r.score).collect());
        metrics.prompt_chars = prompt.chars().count();

        if context.is_empty() {
            tracing::warn!("No context documents retrieved, generating without context");
        }

        let timer = MetricsTimer::start();
        let answer = self.generator.generate(&prompt).await.map_err(|e| {
            tracing::error!("Error during generation with {}: {}", self.generator.name(), e);
            PipelineError::from(e)
        })?;
        metrics.set_generation_latency(timer.stop());

        metrics.report();

        Ok(QueryResponse {
            answer,
            context,
            prompt,
            metrics,
        })
    }

    /// Retrieve the context and build the prompt under the read lock
    fn retrieve_and_build(
        &self,
        text: &str,
        k: usize,
    ) -> Result<(Vec<ScoredDocument>, String), PipelineError> {
        let corpus = self.corpus.read().map_err(|_| PipelineError::Poisoned)?;

        tracing::debug!(
            "Retrieving context: retriever={}, k={}, indexed={}",
            corpus.retriever.kind(),
            k,
            corpus.retriever.len()
        );

        let context = corpus.retriever.retrieve(text, k)?;
        let prompt = PromptBuilder::build(text, context.iter().map(|r| r.document.as_ref()));

        Ok((context, prompt))
    }

    pub fn state(&self) -> PipelineState {
        if self.document_count() == 0 {
            PipelineState::Empty
        } else {
            PipelineState::Ready
        }
    }

    /// Snapshot of the stored documents in insertion order
    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.read_corpus().store.all().to_vec()
    }

    pub fn document_count(&self) -> usize {
        self.read_corpus().store.len()
    }

    pub fn retriever_kind(&self) -> RetrieverKind {
        self.read_corpus().retriever.kind()
    }

    /// Read guard for the inspection accessors.
    ///
    /// A writer only calls out to the embedder, which runs before either the
    /// store or the retriever is touched, so a poisoned corpus still holds
    /// them in lockstep.
    fn read_corpus(&self) -> RwLockReadGuard<'_, Corpus> {
        self.corpus.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rag_core::GenerationError;
    use std::sync::Mutex;

    /// Records prompts and echoes a fixed answer
    #[derive(Default)]
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("ok".to_string())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.bm25, Bm25Params::default());
    }

    #[test]
    fn test_state_transitions() {
        let pipeline = RagPipeline::lexical(PipelineConfig::default(), RecordingGenerator::default());
        assert_eq!(pipeline.state(), PipelineState::Empty);

        let stats = pipeline
            .load_documents(vec![Document::new("1", "Cats are mammals")])
            .unwrap();
        assert_eq!(
            stats,
            LoadStats {
                documents_added: 1,
                total_documents: 1
            }
        );
        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert_eq!(pipeline.retriever_kind(), RetrieverKind::Lexical);
    }

    #[test]
    fn test_failed_load_keeps_empty_state() {
        let pipeline = RagPipeline::lexical(PipelineConfig::default(), RecordingGenerator::default());
        let err = pipeline
            .load_documents(vec![Document::new("1", "a"), Document::new("1", "b")])
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(pipeline.state(), PipelineState::Empty);
    }

    #[tokio::test]
    async fn test_query_uses_default_top_k() {
        let config = PipelineConfig {
            top_k: 2,
            ..Default::default()
        };
        let pipeline = RagPipeline::lexical(config, RecordingGenerator::default());
        pipeline
            .load_documents((0..4).map(|i| Document::new(i.to_string(), format!("note {}", i))))
            .unwrap();

        pipeline.query("note").await.unwrap();

        let prompts = pipeline.generator().prompts.lock().unwrap();
        let context_lines = prompts[0].matches("note ").count();
        assert_eq!(context_lines, 2);
    }

    #[tokio::test]
    async fn test_zero_k_is_retrieval_error() {
        let pipeline = RagPipeline::lexical(PipelineConfig::default(), RecordingGenerator::default());
        let err = pipeline.query_with_k("anything", 0).await.unwrap_err();

        assert!(err.is_retrieval());
        assert!(pipeline.generator().prompts.lock().unwrap().is_empty());
    }
}
