mod dataset;
mod echo;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rag_pipeline::{
    CachedGenerator, Generator, LlmClient, LlmConfig, PipelineConfig, RagPipeline,
    ResponseCacheConfig,
};
use rag_retrieval::{Embedder, FastEmbedConfig, FastEmbedder, HashingEmbedder, RetrieverKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use echo::EchoGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderChoice {
    /// BGE-small-en-v1.5 via fastembed (downloads on first run)
    Fastembed,
    /// Feature-hashing bag of words, no download
    Hashing,
}

/// Retrieval-augmented question answering over a document set
///
/// Loads one or more `{id, text}` datasets, indexes them with the chosen
/// retriever and answers each query with the selected model.
#[derive(Parser, Debug)]
#[command(name = "rag-query", author, version, about, long_about = None)]
struct Args {
    /// Dataset files (JSON array or JSON Lines); each is loaded as one batch
    #[arg(short, long, required = true)]
    dataset: Vec<PathBuf>,

    /// Model name: openai/<model>, ollama/<model> or anthropic/<model>
    #[arg(short, long, default_value = "openai/gpt-4-turbo")]
    model: String,

    /// Override the provider's API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Retriever: bm25 (lexical) or embedding
    #[arg(short, long, default_value = "bm25")]
    retriever: RetrieverKind,

    /// Embedding model for the embedding retriever
    #[arg(long, value_enum, default_value = "fastembed")]
    embedder: EmbedderChoice,

    /// Number of context documents per query
    #[arg(short = 'k', long, default_value = "5")]
    top_k: usize,

    /// Query to answer (repeatable); reads one query per line from stdin if omitted
    #[arg(short, long)]
    query: Vec<String>,

    /// Give up on a query after this many seconds
    #[arg(long, default_value = "120")]
    query_timeout: u64,

    /// Reuse answers for identical prompts
    #[arg(long)]
    cache: bool,

    /// Print the prompt instead of calling a model
    #[arg(long)]
    dry_run: bool,

    /// Print the retrieved context with scores before each answer
    #[arg(long)]
    show_context: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn build_generator(&self) -> Result<Arc<dyn Generator>> {
        let generator: Arc<dyn Generator> = if self.dry_run {
            Arc::new(EchoGenerator)
        } else {
            let config = LlmConfig {
                api_base: self.api_base.clone(),
                ..LlmConfig::for_model(&self.model)?
            };
            let api_key = config
                .provider
                .api_key_env()
                .and_then(|var| std::env::var(var).ok());
            Arc::new(LlmClient::new(config, api_key)?)
        };

        if self.cache {
            return Ok(Arc::new(CachedGenerator::new(
                generator,
                ResponseCacheConfig::default(),
            )));
        }

        Ok(generator)
    }

    fn build_embedder(&self) -> Result<Arc<dyn Embedder>> {
        let embedder: Arc<dyn Embedder> = match self.embedder {
            EmbedderChoice::Fastembed => Arc::new(FastEmbedder::new(FastEmbedConfig::default())?),
            EmbedderChoice::Hashing => Arc::new(HashingEmbedder::default()),
        };
        Ok(embedder)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so answers on stdout stay clean
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "rag_query={},rag_pipeline={},rag_retrieval={}",
                args.log_level, args.log_level, args.log_level
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("RAG query tool starting");
    tracing::info!("Configuration:");
    tracing::info!("  Datasets: {:?}", args.dataset);
    tracing::info!("  Model: {}", if args.dry_run { "echo (dry run)" } else { args.model.as_str() });
    tracing::info!("  Retriever: {}", args.retriever);
    tracing::info!("  Top K: {}", args.top_k);

    let config = PipelineConfig {
        top_k: args.top_k,
        ..Default::default()
    };
    let generator = args.build_generator()?;

    let pipeline = match args.retriever {
        RetrieverKind::Lexical => RagPipeline::lexical(config, generator),
        RetrieverKind::Embedding => RagPipeline::embedding(config, args.build_embedder()?, generator),
    };

    for path in &args.dataset {
        let documents = dataset::load_dataset(path).await?;
        let stats = pipeline
            .load_documents(documents)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        tracing::info!(
            "Loaded {}: {} documents (total: {})",
            path.display(),
            stats.documents_added,
            stats.total_documents
        );
    }

    let queries = if args.query.is_empty() {
        read_queries_from_stdin().await?
    } else {
        args.query.clone()
    };

    let mut failures = 0usize;
    for query in &queries {
        let outcome = tokio::time::timeout(
            Duration::from_secs(args.query_timeout),
            pipeline.query_with_metrics(query, args.top_k),
        )
        .await;

        match outcome {
            Ok(Ok(response)) => {
                if args.show_context {
                    for (rank, scored) in response.context.iter().enumerate() {
                        println!(
                            "[{}] {} (score: {:.3}) {}",
                            rank + 1,
                            scored.document.id,
                            scored.score,
                            scored.document.text
                        );
                    }
                }
                println!("{}", response.answer);
            }
            Ok(Err(e)) => {
                failures += 1;
                tracing::error!("Query failed: {}", e);
            }
            Err(_) => {
                failures += 1;
                tracing::error!("Query timed out after {}s: {}", args.query_timeout, query);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} queries failed", failures, queries.len());
    }

    Ok(())
}

async fn read_queries_from_stdin() -> Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut queries = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            queries.push(line.to_string());
        }
    }

    Ok(queries)
}
