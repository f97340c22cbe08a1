use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use reqwest::StatusCode;
use tracing::warn;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{FeedloopError, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

/// Added to the HTTP timeout so the gateway's own deadline fires first.
const HTTP_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// How a failed completion call should be handled.
#[derive(Debug)]
enum Failure {
    /// Worth another attempt if the retry budget allows.
    Transient(FeedloopError),
    /// Reported as is.
    Fatal(FeedloopError),
}

impl Failure {
    fn into_error(self) -> FeedloopError {
        match self {
            Self::Transient(error) | Self::Fatal(error) => error,
        }
    }
}

/// Single-prompt chat completion client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    base_url: String,
    model: String,
    max_retries: u32,
    temperature: Option<f32>,
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let (provider, bare_model) = parse_llm_provider_model(&config.model);

        if provider_needs_api_key(&config.model) && config.api_key.is_none() {
            return Err(FeedloopError::LlmUnavailable(format!(
                "{provider} requires an API key"
            )));
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());
        // Unprefixed names are passed through untouched.
        let model = if provider.eq_ignore_ascii_case("local") {
            config.model.clone()
        } else {
            bare_model.to_string()
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs) + HTTP_TIMEOUT_GRACE)
            .build()
            .map_err(|e| FeedloopError::Llm(format!("Failed to build HTTP client: {e}")))?;

        // async-openai backs off on 5xx internally; keep that inside the request deadline.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(config.timeout_secs)),
            ..Default::default()
        };

        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_base(base_url.clone())
                .with_api_key(config.api_key.clone().unwrap_or_default()),
        )
        .with_http_client(http)
        .with_backoff(backoff);

        Ok(Self {
            client,
            base_url,
            model,
            max_retries: config.max_retries,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `prompt` as a single user message and return the first choice.
    ///
    /// Transient failures are retried up to `max_retries` times with
    /// exponential delay; rate limits and auth failures never are.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(FeedloopError::Validation("Prompt cannot be empty".to_string()));
        }
        let request = self.request(prompt)?;

        let mut attempt = 0;
        loop {
            let failure = match self.client.chat().create(request.clone()).await {
                Ok(response) => return first_choice(response),
                Err(error) => classify(error),
            };

            match failure {
                Failure::Transient(error) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(100 << (attempt - 1).min(6));
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying LLM completion"
                    );
                    tokio::time::sleep(delay).await;
                }
                failure => return Err(failure.into_error()),
            }
        }
    }

    fn request(&self, prompt: &str) -> Result<CreateChatCompletionRequest> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| FeedloopError::Validation(format!("Invalid prompt: {e}")))?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone()).messages(vec![message.into()]);
        if let Some(temperature) = self.temperature {
            args.temperature(temperature);
        }

        args.build()
            .map_err(|e| FeedloopError::Validation(format!("Invalid completion request: {e}")))
    }
}

fn first_choice(response: CreateChatCompletionResponse) -> Result<String> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(FeedloopError::Llm("Model returned an empty answer".to_string()));
    }
    Ok(text)
}

fn classify(error: OpenAIError) -> Failure {
    match error {
        OpenAIError::Reqwest(e) => match e.status() {
            Some(StatusCode::TOO_MANY_REQUESTS) => {
                Failure::Fatal(FeedloopError::LlmRateLimit { retry_after: None })
            }
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => Failure::Fatal(
                FeedloopError::ApiAuth(format!("LLM rejected the credentials: {e}")),
            ),
            Some(status) if !status.is_server_error() => {
                Failure::Fatal(FeedloopError::Llm(format!("LLM request failed: {e}")))
            }
            _ => Failure::Transient(FeedloopError::Llm(format!("LLM request failed: {e}"))),
        },
        OpenAIError::ApiError(api) if is_rate_limited(&api) => {
            Failure::Fatal(FeedloopError::LlmRateLimit { retry_after: None })
        }
        OpenAIError::ApiError(api) if is_auth_failure(&api) => Failure::Fatal(
            FeedloopError::ApiAuth(format!("LLM rejected the credentials: {api}")),
        ),
        // Untyped API errors come from proxies and overloaded backends.
        OpenAIError::ApiError(api) if api.r#type.is_none() && api.code.is_none() => {
            Failure::Transient(FeedloopError::Llm(format!("LLM API error: {api}")))
        }
        OpenAIError::ApiError(api) => {
            Failure::Fatal(FeedloopError::Llm(format!("LLM API error: {api}")))
        }
        OpenAIError::JSONDeserialize(e) => Failure::Fatal(FeedloopError::Llm(format!(
            "Unreadable LLM response: {e}"
        ))),
        OpenAIError::InvalidArgument(message) => Failure::Fatal(FeedloopError::Validation(message)),
        other => Failure::Fatal(FeedloopError::Llm(other.to_string())),
    }
}

fn api_error_text(api: &ApiError) -> (String, String, String) {
    (
        api.message.to_lowercase(),
        api.r#type.as_deref().unwrap_or_default().to_lowercase(),
        api.code.as_deref().unwrap_or_default().to_lowercase(),
    )
}

fn is_rate_limited(api: &ApiError) -> bool {
    let (message, kind, code) = api_error_text(api);
    message.contains("rate limit")
        || message.contains("too many requests")
        || kind.contains("rate_limit")
        || code.contains("rate_limit")
        || code == "insufficient_quota"
}

fn is_auth_failure(api: &ApiError) -> bool {
    let (message, kind, code) = api_error_text(api);
    ["unauthorized", "forbidden", "authentication", "api key"]
        .iter()
        .any(|needle| message.contains(needle))
        || code.contains("invalid_api_key")
        || code.contains("authentication")
        || kind.contains("authentication")
}

/// Hosted providers need a key; local runtimes do not.
pub(crate) fn provider_needs_api_key(model: &str) -> bool {
    let (provider, _) = parse_llm_provider_model(model);
    !matches!(
        provider.to_lowercase().as_str(),
        "ollama" | "local" | "lmstudio"
    )
}

fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openrouter" => OPENROUTER_BASE_URL,
        "ollama" => OLLAMA_BASE_URL,
        "lmstudio" => LMSTUDIO_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(model: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
            base_url: None,
            timeout_secs: 30,
            max_retries: 0,
            temperature: None,
        }
    }

    fn api_error(message: &str, kind: Option<&str>, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: kind.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_hosted_provider_without_key_is_unavailable() {
        let result = LlmApiClient::new(&llm_config("openai/gpt-4.1-mini", None));
        assert!(matches!(result, Err(FeedloopError::LlmUnavailable(_))));
    }

    #[test]
    fn test_local_runtime_needs_no_key() {
        let client = LlmApiClient::new(&llm_config("ollama/llama3", None)).unwrap();
        assert_eq!(client.model(), "llama3");
        assert_eq!(client.base_url(), OLLAMA_BASE_URL);
    }

    #[test]
    fn test_unprefixed_model_is_kept_whole() {
        let client = LlmApiClient::new(&llm_config("mistral-7b-instruct", None)).unwrap();
        assert_eq!(client.model(), "mistral-7b-instruct");
        assert_eq!(client.base_url(), OPENAI_BASE_URL);
    }

    #[test]
    fn test_request_carries_prompt_and_temperature() {
        let mut config = llm_config("openrouter/meta/llama-3", Some("sk"));
        config.temperature = Some(0.2);
        let client = LlmApiClient::new(&config).unwrap();

        let request = client.request("question").unwrap();
        assert_eq!(request.model, "meta/llama-3");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(client.base_url(), OPENROUTER_BASE_URL);
    }

    #[test]
    fn test_rate_limit_is_not_retried() {
        let failure = classify(api_error(
            "Rate limit reached for requests",
            Some("requests"),
            Some("rate_limit_exceeded"),
        ));
        assert!(matches!(
            failure,
            Failure::Fatal(FeedloopError::LlmRateLimit { .. })
        ));
    }

    #[test]
    fn test_bad_key_maps_to_auth_error() {
        let failure = classify(api_error(
            "Incorrect API key provided",
            Some("invalid_request_error"),
            Some("invalid_api_key"),
        ));
        assert!(matches!(failure, Failure::Fatal(FeedloopError::ApiAuth(_))));
    }

    #[test]
    fn test_untyped_api_error_is_transient() {
        let failure = classify(api_error("upstream overloaded", None, None));
        assert!(matches!(failure, Failure::Transient(FeedloopError::Llm(_))));

        let failure = classify(api_error(
            "The model does not exist",
            Some("invalid_request_error"),
            Some("model_not_found"),
        ));
        assert!(matches!(failure, Failure::Fatal(FeedloopError::Llm(_))));
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected() {
        let client = LlmApiClient::new(&llm_config("ollama/llama3", None)).unwrap();
        let err = client.complete("  ").await.unwrap_err();
        assert!(matches!(err, FeedloopError::Validation(_)));
    }
}
