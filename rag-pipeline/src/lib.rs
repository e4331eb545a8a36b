pub mod llm;
pub mod pipeline;

// Re-export commonly used items from llm module
pub use llm::{
    CachedGenerator, Generator, LlmClient, LlmConfig, LlmProvider, LlmResponse, ModelSpec,
    PromptBuilder, QueryMetrics, ResponseCacheConfig,
};

// Re-export commonly used items from pipeline module
pub use pipeline::{LoadStats, PipelineConfig, PipelineState, QueryResponse, RagPipeline};
