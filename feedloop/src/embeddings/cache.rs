use async_trait::async_trait;
use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::Embedder;
use crate::error::Result;

/// Thread-safe LRU cache of query embeddings keyed by a hash of the query text.
#[derive(Clone)]
pub struct QueryEmbeddingCache {
    cache: Arc<Mutex<LruCache<u64, Vec<f32>>>>,
}

impl QueryEmbeddingCache {
    /// Returns `None` for a zero capacity.
    pub fn new(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(|capacity| Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        })
    }

    pub fn get(&self, query: &str) -> Option<Vec<f32>> {
        let key = Self::key(query);
        self.cache.lock().ok()?.get(&key).cloned()
    }

    pub fn put(&self, query: &str, vector: Vec<f32>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(Self::key(query), vector);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(query: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        query.as_bytes().hash(&mut hasher);
        hasher.finish()
    }
}

/// Wraps another embedder and memoizes `embed_query`.
///
/// Passage embeddings are never cached.
pub struct CachingEmbedder {
    inner: Arc<dyn Embedder>,
    cache: QueryEmbeddingCache,
}

impl CachingEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, cache: QueryEmbeddingCache) -> Self {
        Self { inner, cache }
    }

    /// Wrap `inner` when `capacity` is non-zero, otherwise return it unchanged.
    pub fn wrap(inner: Arc<dyn Embedder>, capacity: usize) -> Arc<dyn Embedder> {
        match QueryEmbeddingCache::new(capacity) {
            Some(cache) => Arc::new(Self::new(inner, cache)),
            None => inner,
        }
    }
}

#[async_trait]
impl Embedder for CachingEmbedder {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.cache.get(query) {
            debug!("Query embedding cache hit");
            return Ok(vector);
        }

        let vector = self.inner.embed_query(query).await?;
        self.cache.put(query, vector.clone());
        Ok(vector)
    }

    async fn embed_passages(&self, passages: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.inner.embed_passages(passages).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
