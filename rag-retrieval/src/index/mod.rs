pub mod document_store;
pub mod embedding;
pub mod fastembed_embedder;
pub mod lexical;
pub mod retriever;

// Re-export commonly used items
pub use document_store::{DocumentStore, PreparedBatch};
pub use embedding::{cosine_similarity, Embedder, EmbeddingIndex, HashingEmbedder};
pub use fastembed_embedder::{FastEmbedConfig, FastEmbedder};
pub use lexical::{tokenize, Bm25Params, LexicalIndex};
pub use retriever::{Retriever, RetrieverKind, ScoredDocument};
