use std::sync::Arc;

use crate::config::Config;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::feedback::{FeedbackLedger, FeedbackRepository};
use crate::llm::LlmProvider;
use crate::processing::DocumentChunker;
use crate::services::{ChatService, IngestService};
use crate::store::{PersistentIndex, VectorStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub embedder: Arc<dyn Embedder>,
    pub llm: LlmProvider,
    pub feedback: Arc<FeedbackRepository>,
    pub chat: ChatService,
    pub ingest: IngestService,
}

impl AppState {
    /// Open both indexes and the ledger under the configured data directory
    /// and wire the services over them.
    pub async fn new(config: Config, embedder: Arc<dyn Embedder>, llm: LlmProvider) -> Result<Self> {
        let config = Arc::new(config);
        let storage = &config.storage;
        let dimensions = embedder.dimensions();

        let documents: Arc<dyn VectorStore> = Arc::new(
            PersistentIndex::open("documents", storage.document_index_path(), dimensions).await,
        );
        let feedback_index: Arc<dyn VectorStore> = Arc::new(
            PersistentIndex::open("feedback", storage.feedback_index_path(), dimensions).await,
        );
        let ledger = Arc::new(FeedbackLedger::open(storage.feedback_log_path()).await?);

        let feedback = Arc::new(FeedbackRepository::new(
            ledger,
            feedback_index,
            embedder.clone(),
        ));

        let chat = ChatService::new(
            documents.clone(),
            feedback.clone(),
            embedder.clone(),
            llm.clone(),
            config.retrieval.clone(),
        );
        let ingest = IngestService::new(
            documents,
            embedder.clone(),
            DocumentChunker::new(&config.processing),
            storage.upload_dir(),
        );

        Ok(Self {
            config,
            embedder,
            llm,
            feedback,
            chat,
            ingest,
        })
    }
}
