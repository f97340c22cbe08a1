use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::api::{default_base_url, EmbeddingApiClient, EmbeddingApiConfig};
use super::Embedder;
use crate::config::{parse_provider_model, EmbeddingsConfig};
use crate::error::{FeedloopError, Result};

#[derive(Clone)]
enum EmbeddingBackend {
    Local {
        model: Arc<Mutex<TextEmbedding>>,
        batch_size: usize,
    },
    Api {
        client: EmbeddingApiClient,
        batch_size: usize,
    },
}

/// Embedder backed by a local ONNX model or an OpenAI-compatible API.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    model_name: String,
    dimensions: usize,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);
        let batch_size = config.batch_size.max(1);

        let backend = if provider == "local" {
            let model = build_model(resolve_embedding_model(model_name))?;
            info!(model = model_name, "Loaded local embedding model");
            EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(model)),
                batch_size,
            }
        } else {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(provider).to_string());
            info!(provider, model = model_name, %base_url, "Using embedding API");
            EmbeddingBackend::Api {
                client: EmbeddingApiClient::new(EmbeddingApiConfig {
                    base_url,
                    api_key: config.api_key.clone(),
                    model: model_name.to_string(),
                    timeout_secs: config.timeout_secs,
                    max_retries: config.max_retries,
                })?,
                batch_size,
            }
        };

        Ok(Self {
            backend,
            model_name: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        match &self.backend {
            EmbeddingBackend::Local { model, batch_size } => {
                let model = Arc::clone(model);
                let batch_size = *batch_size;
                tokio::task::spawn_blocking(move || {
                    let mut model = model.lock().map_err(|e| {
                        FeedloopError::Embedding(format!("Embedding model lock poisoned: {e}"))
                    })?;
                    model
                        .embed(texts, Some(batch_size))
                        .map_err(|e| FeedloopError::Embedding(e.to_string()))
                })
                .await
                .map_err(|e| FeedloopError::Embedding(format!("Embedding worker failed: {e}")))?
            }
            EmbeddingBackend::Api { client, .. } => client.embed(&texts).await,
        }
    }

    fn check_dimensions(&self, vectors: &[Vec<f32>]) -> Result<()> {
        match vectors.iter().find(|v| v.len() != self.dimensions) {
            Some(bad) => Err(FeedloopError::Embedding(format!(
                "Model {} produced {} dimensions, configured for {}",
                self.model_name,
                bad.len(),
                self.dimensions
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_batch(vec![query.to_string()]).await?;
        self.check_dimensions(&vectors)?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| FeedloopError::Embedding("No embedding generated".to_string()))
    }

    async fn embed_passages(&self, passages: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = match &self.backend {
            EmbeddingBackend::Local { batch_size, .. } | EmbeddingBackend::Api { batch_size, .. } => {
                *batch_size
            }
        };

        let mut all_embeddings = Vec::with_capacity(passages.len());
        for batch in passages.chunks(chunk_size) {
            let mut embedded = self.embed_batch(batch.to_vec()).await?;
            self.check_dimensions(&embedded)?;
            all_embeddings.append(&mut embedded);
            tokio::task::yield_now().await;
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn resolve_embedding_model(model_name: &str) -> EmbeddingModel {
    match model_name {
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            EmbeddingModel::AllMiniLML12V2
        }
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => {
            EmbeddingModel::NomicEmbedTextV15
        }
        _ => EmbeddingModel::AllMiniLML6V2,
    }
}

fn build_model(embedding_model: EmbeddingModel) -> Result<TextEmbedding> {
    TextEmbedding::try_new(InitOptions::new(embedding_model).with_show_download_progress(true))
        .map_err(|e| FeedloopError::Embedding(e.to_string()))
}
