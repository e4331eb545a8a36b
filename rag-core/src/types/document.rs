use serde::{Deserialize, Serialize};

use crate::types::DocumentId;

/// A source document as it arrives from the ingestion boundary and as it is
/// kept in the store once normalized.
///
/// Missing fields deserialize to empty strings so that the store, not the
/// parser, reports them as validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: DocumentId,
    #[serde(default)]
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Return a copy with normalized text
    pub fn normalized(&self) -> Self {
        Self {
            id: self.id.clone(),
            text: normalize_text(&self.text),
        }
    }

    /// Whether the text carries any content after normalization
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Normalize document and query text. Case-folding is the only rule.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}
