use thiserror::Error;

/// A submitted document batch was rejected. The store is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Document at position {position} is missing an id")]
    EmptyId { position: usize },

    #[error("Document {id} has no text")]
    EmptyText { id: String },

    #[error("Document id already stored: {id}")]
    DuplicateId { id: String },

    #[error("Document id repeated within batch: {id}")]
    DuplicateInBatch { id: String },
}

/// Scoring or embedding failed while indexing or retrieving
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// The language model call failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("LLM request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Invalid generator configuration: {0}")]
    Configuration(String),
}

/// Error surfaced to callers of `load_documents` and `query`.
///
/// The underlying cause stays reachable through `source()` so callers can
/// tell a retrieval failure from a generation failure.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document validation failed: {0}")]
    Validation(#[source] ValidationError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] RetrievalError),

    #[error("Generation failed: {0}")]
    Generation(#[source] GenerationError),

    #[error("Index lock poisoned by a panicked writer")]
    Poisoned,
}

impl PipelineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }

    pub fn is_retrieval(&self) -> bool {
        matches!(self, PipelineError::Retrieval(_))
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, PipelineError::Generation(_))
    }
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        PipelineError::Validation(err)
    }
}

impl From<RetrievalError> for PipelineError {
    fn from(err: RetrievalError) -> Self {
        PipelineError::Retrieval(err)
    }
}

impl From<GenerationError> for PipelineError {
    fn from(err: GenerationError) -> Self {
        PipelineError::Generation(err)
    }
}
