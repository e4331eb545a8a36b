pub mod document;

// Re-export common types
pub use document::{normalize_text, Document};

/// Caller-assigned document identifier, unique within one store
pub type DocumentId = String;
