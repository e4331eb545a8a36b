use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use rag_core::RetrievalError;

use super::embedding::Embedder;

/// Configuration for the local ONNX embedding model
#[derive(Debug, Clone)]
pub struct FastEmbedConfig {
    pub model: EmbeddingModel,
    pub show_download_progress: bool,
    pub batch_size: Option<usize>,
}

impl Default for FastEmbedConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModel::BGESmallENV15,
            show_download_progress: true,
            batch_size: None,
        }
    }
}

/// Sentence embedder backed by fastembed (BGE-small-en-v1.5 by default)
pub struct FastEmbedder {
    model: TextEmbedding,
    model_name: String,
    dimension: usize,
    batch_size: Option<usize>,
}

impl FastEmbedder {
    /// Load the embedding model (downloads it on first run)
    pub fn new(config: FastEmbedConfig) -> Result<Self, RetrievalError> {
        let model_name = format!("{:?}", config.model);
        tracing::info!("Loading embedding model ({})...", model_name);

        let model = TextEmbedding::try_new(
            InitOptions::new(config.model).with_show_download_progress(config.show_download_progress),
        )
        .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        // Probe once so the index can validate every vector it caches
        let dimension = model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .map(|vector| vector.len())
            .ok_or_else(|| RetrievalError::Embedding("Failed to generate embedding".to_string()))?;

        tracing::info!("Embedding model loaded: {} ({} dimensions)", model_name, dimension);

        Ok(Self {
            model,
            model_name,
            dimension,
            batch_size: config.batch_size,
        })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let batch: Vec<&String> = texts.iter().collect();
        self.model
            .embed(batch, self.batch_size)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
