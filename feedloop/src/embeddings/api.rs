use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FeedloopError, Result};

/// Default `/v1` root for a provider prefix.
pub fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        _ => "https://api.openai.com/v1",
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsReply {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Outcome of one POST that did not yield vectors.
enum Attempt {
    Retry(FeedloopError),
    GiveUp(FeedloopError),
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone)]
pub struct EmbeddingApiClient {
    http: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
}

impl EmbeddingApiClient {
    pub fn new(config: EmbeddingApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedloopError::Embedding(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key: config.api_key,
            model: config.model,
            max_retries: config.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One vector per input, in input order.
    ///
    /// 429, 5xx and transport errors are retried up to `max_retries` times;
    /// 401/403 and other client errors fail at once.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0;
        loop {
            let error = match self.post(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(Attempt::GiveUp(error)) => return Err(error),
                Err(Attempt::Retry(error)) => error,
            };

            if attempt >= self.max_retries {
                return Err(error);
            }
            attempt += 1;
            let delay = Duration::from_millis(100 << (attempt - 1).min(6));
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying embedding request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn post(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, Attempt> {
        let mut request = self.http.post(&self.url).json(&EmbeddingsBody {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            Attempt::Retry(FeedloopError::Embedding(format!("Embedding request failed: {e}")))
        })?;

        let status = response.status();
        if status.is_success() {
            let reply: EmbeddingsReply = response.json().await.map_err(|e| {
                Attempt::GiveUp(FeedloopError::Embedding(format!(
                    "Unreadable embedding response: {e}"
                )))
            })?;
            return in_input_order(reply, texts.len()).map_err(Attempt::GiveUp);
        }

        Err(failed_status(status, response).await)
    }
}

async fn failed_status(status: StatusCode, response: Response) -> Attempt {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        return Attempt::Retry(FeedloopError::ApiRateLimit { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Attempt::GiveUp(FeedloopError::ApiAuth(body))
        }
        s if s.is_server_error() => {
            Attempt::Retry(FeedloopError::Embedding(format!("Embedding API {s}: {body}")))
        }
        s => Attempt::GiveUp(FeedloopError::Embedding(format!("Embedding API {s}: {body}"))),
    }
}

fn in_input_order(reply: EmbeddingsReply, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut items = reply.data;
    if items.len() != expected {
        return Err(FeedloopError::Embedding(format!(
            "Expected {expected} embeddings, received {}",
            items.len()
        )));
    }

    if items.iter().all(|item| item.index.is_some()) {
        items.sort_by_key(|item| item.index);
    }
    Ok(items.into_iter().map(|item| item.embedding).collect())
}
