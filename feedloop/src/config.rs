use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-4.1-mini";

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embeddings: EmbeddingsConfig,
    pub processing: ProcessingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,
}

/// On-disk layout. Everything lives under a single data directory.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn document_index_path(&self) -> PathBuf {
        self.data_dir.join("vector_store").join("index.json")
    }

    pub fn feedback_index_path(&self) -> PathBuf {
        self.data_dir.join("feedback_vector_store").join("index.json")
    }

    pub fn feedback_log_path(&self) -> PathBuf {
        self.data_dir.join("feedback_log.json")
    }

    /// Create the data directory tree if it does not exist yet.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [
            self.data_dir.clone(),
            self.upload_dir(),
            parent_of(&self.document_index_path()),
            parent_of(&self.feedback_index_path()),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Capacity of the query embedding cache; 0 disables it.
    pub cache_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub document_limit: usize,
    pub feedback_limit: usize,
    pub query_similarity_threshold: f32,
    pub document_relevance_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            document_limit: 5,
            feedback_limit: 5,
            query_similarity_threshold: 0.2,
            document_relevance_threshold: 0.1,
        }
    }
}

/// LLM configuration for the chat completion model
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("FEEDLOOP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("FEEDLOOP_PORT", 8000),
                allowed_origins: parse_list(
                    &env::var("CORS_ALLOWED_ORIGINS")
                        .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
                ),
            },
            storage: StorageConfig::new(
                env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            ),
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 384),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 256),
                api_key: non_empty_env("EMBEDDING_API_KEY"),
                base_url: non_empty_env("EMBEDDING_BASE_URL"),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 0),
                cache_size: parse_env_or("EMBEDDING_CACHE_SIZE", 1000),
            },
            processing: ProcessingConfig {
                chunk_size: parse_env_or("CHUNK_SIZE", 800),
                chunk_overlap: parse_env_or("CHUNK_OVERLAP", 120),
                max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 25 * 1024 * 1024),
            },
            retrieval: RetrievalConfig {
                document_limit: parse_env_or("DOCUMENT_SEARCH_LIMIT", 5),
                feedback_limit: parse_env_or("FEEDBACK_SEARCH_LIMIT", 5),
                query_similarity_threshold: parse_env_or(
                    "FEEDBACK_QUERY_SIMILARITY_THRESHOLD",
                    0.2,
                ),
                document_relevance_threshold: parse_env_or(
                    "FEEDBACK_DOCUMENT_RELEVANCE_THRESHOLD",
                    0.1,
                ),
            },
            llm: {
                let model = non_empty_env("LLM_MODEL");
                let api_key = non_empty_env("LLM_API_KEY").or_else(|| non_empty_env("OPENAI_API_KEY"));

                if model.is_some() || api_key.is_some() {
                    Some(LlmConfig {
                        model: model.unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                        api_key,
                        base_url: non_empty_env("LLM_BASE_URL"),
                        timeout_secs: parse_env_or("LLM_TIMEOUT", 60),
                        max_retries: parse_env_or("LLM_MAX_RETRIES", 0),
                        temperature: non_empty_env("LLM_TEMPERATURE")
                            .and_then(|raw| raw.parse().ok()),
                    })
                } else {
                    None
                }
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known embedding providers that use OpenAI-compatible APIs
const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio", "local"];

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to local provider
    ("local", model)
}

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const LLM_VARS: &[&str] = &["LLM_MODEL", "LLM_API_KEY", "OPENAI_API_KEY", "LLM_TIMEOUT"];

    fn clear_llm_env() {
        for var in LLM_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_llm_config_absent_without_model_or_key() {
        clear_llm_env();
        let config = Config::default();
        assert!(config.llm.is_none());
    }

    #[test]
    #[serial]
    fn test_llm_config_from_openai_key_uses_default_model() {
        clear_llm_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");

        let config = Config::default();
        let llm = config.llm.expect("llm config should be present");
        assert_eq!(llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(llm.timeout_secs, 60);
        assert_eq!(llm.max_retries, 0);

        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_llm_api_key_takes_precedence_over_openai_key() {
        clear_llm_env();
        std::env::set_var("OPENAI_API_KEY", "sk-openai");
        std::env::set_var("LLM_API_KEY", "sk-llm");

        let config = Config::default();
        assert_eq!(config.llm.unwrap().api_key.as_deref(), Some("sk-llm"));

        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_keyless_model_enables_llm_config() {
        clear_llm_env();
        std::env::set_var("LLM_MODEL", "ollama/llama3");

        let config = Config::default();
        let llm = config.llm.unwrap();
        assert_eq!(llm.model, "ollama/llama3");
        assert!(llm.api_key.is_none());

        clear_llm_env();
    }

    #[test]
    #[serial]
    fn test_retrieval_defaults() {
        for var in [
            "DOCUMENT_SEARCH_LIMIT",
            "FEEDBACK_SEARCH_LIMIT",
            "FEEDBACK_QUERY_SIMILARITY_THRESHOLD",
            "FEEDBACK_DOCUMENT_RELEVANCE_THRESHOLD",
        ] {
            std::env::remove_var(var);
        }

        let config = Config::default();
        assert_eq!(config.retrieval.document_limit, 5);
        assert_eq!(config.retrieval.feedback_limit, 5);
        assert_eq!(config.retrieval.query_similarity_threshold, 0.2);
        assert_eq!(config.retrieval.document_relevance_threshold, 0.1);
    }

    #[test]
    #[serial]
    fn test_invalid_threshold_falls_back_to_default() {
        std::env::set_var("FEEDBACK_QUERY_SIMILARITY_THRESHOLD", "not-a-number");
        let config = Config::default();
        assert_eq!(config.retrieval.query_similarity_threshold, 0.2);
        std::env::remove_var("FEEDBACK_QUERY_SIMILARITY_THRESHOLD");
    }

    #[test]
    #[serial]
    fn test_allowed_origins_parsing() {
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://a.example, ,https://b.example");
        let config = Config::default();
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        std::env::remove_var("CORS_ALLOWED_ORIGINS");

        let config = Config::default();
        assert_eq!(config.server.allowed_origins.len(), 2);
    }

    #[test]
    fn test_storage_layout() {
        let storage = StorageConfig::new("/srv/feedloop");
        assert_eq!(
            storage.feedback_log_path(),
            PathBuf::from("/srv/feedloop/feedback_log.json")
        );
        assert_eq!(
            storage.document_index_path(),
            PathBuf::from("/srv/feedloop/vector_store/index.json")
        );
        assert_eq!(
            storage.feedback_index_path(),
            PathBuf::from("/srv/feedloop/feedback_vector_store/index.json")
        );
        assert_eq!(storage.upload_dir(), PathBuf::from("/srv/feedloop/uploads"));
    }

    #[test]
    fn test_parse_provider_model() {
        assert_eq!(
            parse_provider_model("openai/text-embedding-3-small"),
            ("openai", "text-embedding-3-small")
        );
        assert_eq!(
            parse_provider_model("sentence-transformers/all-MiniLM-L6-v2"),
            ("local", "sentence-transformers/all-MiniLM-L6-v2")
        );
        assert_eq!(parse_llm_provider_model("gpt-4.1-mini"), ("local", "gpt-4.1-mini"));
    }
}
