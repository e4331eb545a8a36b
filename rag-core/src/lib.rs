pub mod error;
pub mod types;

// Re-export common types
pub use error::{GenerationError, PipelineError, RetrievalError, ValidationError};
pub use types::{normalize_text, Document, DocumentId};
