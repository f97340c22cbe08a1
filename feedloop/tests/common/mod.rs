#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use feedloop::config::{LlmConfig, ProcessingConfig, RetrievalConfig};
use feedloop::embeddings::{Embedder, HashingEmbedder};
use feedloop::feedback::{FeedbackLedger, FeedbackRepository};
use feedloop::llm::LlmProvider;
use feedloop::models::{FeedbackEntry, LoadedDocument, UserRole};
use feedloop::processing::DocumentChunker;
use feedloop::services::{ChatService, IngestService};
use feedloop::store::{PersistentIndex, VectorStore};

pub const DIMS: usize = 64;

static INIT: Once = Once::new();

/// Initialize a tracing subscriber once per test binary.
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Stores, ledger and services over a throwaway data directory.
pub struct TestStack {
    pub dir: TempDir,
    pub embedder: Arc<dyn Embedder>,
    pub documents: Arc<dyn VectorStore>,
    pub feedback: Arc<FeedbackRepository>,
    pub ingest: IngestService,
}

impl TestStack {
    pub async fn new() -> Self {
        init_test_logger();
        let dir = TempDir::new().expect("temp dir");
        Self::open(dir).await
    }

    /// Open (or reopen) every store under `dir`.
    pub async fn open(dir: TempDir) -> Self {
        let embedder: Arc<dyn Embedder> =
            Arc::new(HashingEmbedder::new(DIMS).expect("hashing embedder"));

        let documents: Arc<dyn VectorStore> = Arc::new(
            PersistentIndex::open(
                "documents",
                dir.path().join("vector_store/index.json"),
                DIMS,
            )
            .await,
        );
        let feedback_index: Arc<dyn VectorStore> = Arc::new(
            PersistentIndex::open(
                "feedback",
                dir.path().join("feedback_vector_store/index.json"),
                DIMS,
            )
            .await,
        );
        let ledger = FeedbackLedger::open(dir.path().join("feedback_log.json"))
            .await
            .expect("ledger");

        let feedback = Arc::new(FeedbackRepository::new(
            Arc::new(ledger),
            feedback_index,
            embedder.clone(),
        ));
        let ingest = IngestService::new(
            documents.clone(),
            embedder.clone(),
            DocumentChunker::new(&ProcessingConfig {
                chunk_size: 800,
                chunk_overlap: 120,
                max_upload_bytes: 1024 * 1024,
            }),
            dir.path().join("uploads"),
        );

        Self {
            dir,
            embedder,
            documents,
            feedback,
            ingest,
        }
    }

    pub fn chat(&self, llm: LlmProvider) -> ChatService {
        ChatService::new(
            self.documents.clone(),
            self.feedback.clone(),
            self.embedder.clone(),
            llm,
            RetrievalConfig::default(),
        )
    }

    /// Chat service that answers with the simulated placeholder.
    pub fn simulated_chat(&self) -> ChatService {
        self.chat(LlmProvider::new(None))
    }

    pub async fn add_document(&self, source: &str, text: &str) {
        self.ingest
            .ingest(vec![LoadedDocument {
                source: source.to_string(),
                text: text.to_string(),
            }])
            .await
            .expect("ingest");
    }

    pub async fn add_feedback(
        &self,
        query: &str,
        response: &str,
        updated_response: &str,
        role: UserRole,
        created_at: DateTime<Utc>,
    ) -> FeedbackEntry {
        let mut entry = FeedbackEntry::new(query, response, updated_response, role);
        entry.created_at = created_at;
        self.feedback.add(entry).await.expect("add feedback")
    }
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid date")
}

pub fn llm_config(base_url: &str, timeout_secs: u64) -> LlmConfig {
    LlmConfig {
        model: "gpt-4o-mini".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url.to_string()),
        timeout_secs,
        max_retries: 0,
        temperature: None,
    }
}

pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

pub fn api_error_body(message: &str, error_type: &str, code: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": code
        }
    })
}
