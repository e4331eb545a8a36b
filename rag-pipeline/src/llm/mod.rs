pub mod generator;
pub mod llm_client;
pub mod metrics;
pub mod prompt_builder;
pub mod response_cache;

// Re-export commonly used items
pub use generator::Generator;
pub use llm_client::{LlmClient, LlmConfig, LlmProvider, LlmResponse, ModelSpec};
pub use metrics::{MetricsTimer, QueryMetrics};
pub use prompt_builder::PromptBuilder;
pub use response_cache::{CachedGenerator, ResponseCacheConfig};
