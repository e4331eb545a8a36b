pub mod rag_pipeline;

pub use rag_pipeline::{LoadStats, PipelineConfig, PipelineState, QueryResponse, RagPipeline};
