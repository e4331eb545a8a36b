use async_trait::async_trait;
use rag_core::GenerationError;
use std::sync::Arc;

/// Language-model capability: prompt in, text out.
///
/// The pipeline owns no model state; the caller builds a generator (hosted
/// API, local model, test fake) and hands it over at construction.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Human-readable name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Arc<G> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Box<G> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
