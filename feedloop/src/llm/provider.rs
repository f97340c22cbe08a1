use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{FeedloopError, Result};
use crate::llm::api::{provider_needs_api_key, LlmApiClient};

/// Returned in place of a model answer when no completion backend is configured.
pub const SIMULATED_RESPONSE: &str = "[Simulated response] Provide the final answer by prioritizing the user feedback over the raw documents.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

/// Text produced for a prompt, and whether it came from a real model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub simulated: bool,
}

/// Completion gateway. Degrades to [`SIMULATED_RESPONSE`] when unconfigured.
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    client: Option<Arc<LlmApiClient>>,
    timeout: Duration,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => match &config.base_url {
                Some(base_url) => LlmBackend::OpenAICompatible {
                    base_url: base_url.clone(),
                },
                None if config.api_key.is_some() => LlmBackend::OpenAI,
                None => {
                    return Self::unavailable(&format!(
                        "Unknown provider in model '{}' and no LLM_BASE_URL set",
                        config.model
                    ))
                }
            },
        };

        if provider_needs_api_key(&config.model)
            && config.api_key.is_none()
            && !matches!(backend, LlmBackend::OpenAICompatible { .. })
        {
            return Self::unavailable(&format!("No API key configured for {}", config.model));
        }

        match LlmApiClient::new(config) {
            Ok(client) => Self {
                backend,
                client: Some(Arc::new(client)),
                timeout: Duration::from_secs(config.timeout_secs.max(1)),
            },
            Err(e) => Self::unavailable(&e.to_string()),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            client: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn model(&self) -> Option<&str> {
        self.client.as_deref().map(LlmApiClient::model)
    }

    /// Send `prompt` to the model, bounded by the configured timeout.
    ///
    /// An unconfigured gateway answers with [`SIMULATED_RESPONSE`] instead of
    /// failing. Timeouts are reported, never retried.
    pub async fn complete(&self, prompt: &str) -> Result<Completion> {
        let Some(client) = &self.client else {
            debug!(reason = %self.unavailable_reason(), "Returning simulated completion");
            return Ok(Completion {
                text: SIMULATED_RESPONSE.to_string(),
                simulated: true,
            });
        };

        match tokio::time::timeout(self.timeout, client.complete(prompt)).await {
            Ok(Ok(text)) => Ok(Completion {
                text,
                simulated: false,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    model = client.model(),
                    "LLM completion timed out"
                );
                Err(FeedloopError::LlmTimeout {
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        }
    }

    pub fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM backend is configured".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str, api_key: Option<&str>, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
            base_url: base_url.map(str::to_string),
            timeout_secs: 5,
            max_retries: 0,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_missing_config_simulates() {
        let provider = LlmProvider::new(None);
        assert!(!provider.is_available());

        let completion = provider.complete("anything").await.unwrap();
        assert!(completion.simulated);
        assert_eq!(completion.text, SIMULATED_RESPONSE);
    }

    #[test]
    fn test_hosted_model_without_key_is_unavailable() {
        let provider = LlmProvider::new(Some(&config("openai/gpt-4.1-mini", None, None)));
        assert!(!provider.is_available());
        assert!(provider.unavailable_reason().contains("No API key"));
    }

    #[test]
    fn test_backend_selection() {
        let provider = LlmProvider::new(Some(&config("openai/gpt-4.1-mini", Some("sk"), None)));
        assert_eq!(provider.backend(), &LlmBackend::OpenAI);
        assert_eq!(provider.model(), Some("gpt-4.1-mini"));

        let provider = LlmProvider::new(Some(&config("ollama/llama3", None, None)));
        assert_eq!(provider.backend(), &LlmBackend::Ollama);

        let provider = LlmProvider::new(Some(&config(
            "my-model",
            None,
            Some("http://llm.internal/v1"),
        )));
        assert_eq!(
            provider.backend(),
            &LlmBackend::OpenAICompatible {
                base_url: "http://llm.internal/v1".to_string()
            }
        );
    }

    #[test]
    fn test_bare_model_with_key_uses_openai() {
        let provider = LlmProvider::new(Some(&config("gpt-4.1-mini", Some("sk"), None)));
        assert_eq!(provider.backend(), &LlmBackend::OpenAI);
        assert_eq!(provider.model(), Some("gpt-4.1-mini"));
    }
}
