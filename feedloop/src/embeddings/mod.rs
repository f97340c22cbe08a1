mod api;
mod cache;
mod hashing;
mod provider;


use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EmbeddingsConfig;
use crate::error::Result;

pub use api::{default_base_url, EmbeddingApiConfig, EmbeddingApiClient};
pub use cache::{CachingEmbedder, QueryEmbeddingCache};
pub use hashing::HashingEmbedder;
pub use provider::EmbeddingProvider;

/// Text to fixed-dimension vector. Identical input yields identical output.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;

    async fn embed_passages(&self, passages: Vec<String>) -> Result<Vec<Vec<f32>>>;

    fn dimensions(&self) -> usize;
}

/// `EMBEDDING_MODEL` value selecting the model-free [`HashingEmbedder`].
pub const HASHING_MODEL: &str = "hashing";

/// Build the configured embedder, behind the query cache when it is enabled.
pub fn from_config(config: &EmbeddingsConfig) -> Result<Arc<dyn Embedder>> {
    let inner: Arc<dyn Embedder> = if config.model.eq_ignore_ascii_case(HASHING_MODEL) {
        Arc::new(HashingEmbedder::new(config.dimensions)?)
    } else {
        Arc::new(EmbeddingProvider::new(config)?)
    };
    Ok(CachingEmbedder::wrap(inner, config.cache_size))
}
