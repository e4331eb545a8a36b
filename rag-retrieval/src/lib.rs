pub mod index;

// Re-export commonly used items
pub use index::{
    Bm25Params, DocumentStore, Embedder, EmbeddingIndex, FastEmbedConfig, FastEmbedder,
    HashingEmbedder, LexicalIndex, PreparedBatch, Retriever, RetrieverKind, ScoredDocument,
};
