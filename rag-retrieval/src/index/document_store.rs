use rag_core::{Document, ValidationError};
use std::collections::HashSet;
use std::sync::Arc;

/// A validated, normalized batch that has not been committed yet.
///
/// Produced by [`DocumentStore::prepare`] so a caller can index the batch
/// first and only commit once every step succeeded.
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    documents: Vec<Arc<Document>>,
}

impl PreparedBatch {
    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Append-only, insertion-ordered document store
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<Arc<Document>>,
    ids: HashSet<String>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and append a batch of documents.
    ///
    /// All-or-nothing: if any document is rejected nothing is appended.
    /// Returns the documents that were added, in submission order.
    pub fn append<I>(&mut self, documents: I) -> Result<Vec<Arc<Document>>, ValidationError>
    where
        I: IntoIterator<Item = Document>,
    {
        let batch = self.prepare(documents)?;
        self.commit(batch)
    }

    /// Validate and normalize a batch against the current store contents
    /// without mutating it.
    pub fn prepare<I>(&self, documents: I) -> Result<PreparedBatch, ValidationError>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut batch_ids = HashSet::new();
        let mut prepared = Vec::new();

        for (position, document) in documents.into_iter().enumerate() {
            if document.id.trim().is_empty() {
                return Err(ValidationError::EmptyId { position });
            }

            let document = document.normalized();
            if !document.has_content() {
                return Err(ValidationError::EmptyText { id: document.id });
            }

            if self.ids.contains(&document.id) {
                return Err(ValidationError::DuplicateId { id: document.id });
            }
            if !batch_ids.insert(document.id.clone()) {
                return Err(ValidationError::DuplicateInBatch { id: document.id });
            }

            prepared.push(Arc::new(document));
        }

        Ok(PreparedBatch {
            documents: prepared,
        })
    }

    /// Commit a prepared batch. Ids are re-checked in case the store changed
    /// since the batch was prepared.
    pub fn commit(&mut self, batch: PreparedBatch) -> Result<Vec<Arc<Document>>, ValidationError> {
        if let Some(existing) = batch
            .documents
            .iter()
            .find(|doc| self.ids.contains(&doc.id))
        {
            return Err(ValidationError::DuplicateId {
                id: existing.id.clone(),
            });
        }

        for document in &batch.documents {
            self.ids.insert(document.id.clone());
            self.documents.push(Arc::clone(document));
        }

        tracing::debug!(
            "Committed {} documents (store size: {})",
            batch.documents.len(),
            self.documents.len()
        );

        Ok(batch.documents)
    }

    /// All stored documents in insertion order
    pub fn all(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Document>> {
        if !self.ids.contains(id) {
            return None;
        }
        self.documents.iter().find(|doc| doc.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
