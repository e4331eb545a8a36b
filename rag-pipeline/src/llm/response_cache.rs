use async_trait::async_trait;
use moka::future::Cache;
use rag_core::GenerationError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::generator::Generator;

/// Configuration for the prompt-keyed response cache
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    pub max_capacity: u64,
    pub time_to_live: Duration,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000,
            time_to_live: Duration::from_secs(60 * 60),
        }
    }
}

/// Generator wrapper that reuses responses for byte-identical prompts.
///
/// Prompts are deterministic in (query, context), so a hit means the same
/// question was asked over the same retrieved context. Errors are never
/// cached.
pub struct CachedGenerator<G> {
    inner: G,
    cache: Cache<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<G: Generator> CachedGenerator<G> {
    pub fn new(inner: G, config: ResponseCacheConfig) -> Self {
        tracing::info!(
            "Response cache enabled for {}: capacity={}, ttl={}s",
            inner.name(),
            config.max_capacity,
            config.time_to_live.as_secs()
        );

        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.time_to_live)
            .build();

        Self {
            inner,
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: Generator> Generator for CachedGenerator<G> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if let Some(cached) = self.cache.get(prompt).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Response cache hit (prompt length: {} chars)", prompt.len());
            return Ok(cached);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let response = self.inner.generate(prompt).await?;
        self.cache.insert(prompt.to_string(), response.clone()).await;

        Ok(response)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
