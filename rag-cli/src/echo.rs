use async_trait::async_trait;
use rag_core::GenerationError;
use rag_pipeline::Generator;

/// Offline generator that answers with the prompt it was given.
///
/// Used by `--dry-run` to inspect retrieval and prompt assembly without
/// calling a model.
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        Ok(prompt.to_string())
    }

    fn name(&self) -> &str {
        "echo"
    }
}
