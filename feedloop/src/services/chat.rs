use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::error::{FeedloopError, Result};
use crate::feedback::{ApplicabilityFilter, FeedbackRepository};
use crate::llm::prompts::{build_prompt, PromptContext};
use crate::llm::LlmProvider;
use crate::models::{ChatRequest, ChatResponse, RetrievedFeedback, SourceDocument};
use crate::store::VectorStore;

/// Answers questions from retrieved documents, steered by applicable feedback.
#[derive(Clone)]
pub struct ChatService {
    documents: Arc<dyn VectorStore>,
    feedback: Arc<FeedbackRepository>,
    embedder: Arc<dyn Embedder>,
    llm: LlmProvider,
    retrieval: RetrievalConfig,
}

impl ChatService {
    pub fn new(
        documents: Arc<dyn VectorStore>,
        feedback: Arc<FeedbackRepository>,
        embedder: Arc<dyn Embedder>,
        llm: LlmProvider,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            documents,
            feedback,
            embedder,
            llm,
            retrieval,
        }
    }

    pub fn llm(&self) -> &LlmProvider {
        &self.llm
    }

    pub async fn answer(&self, request: ChatRequest) -> Result<ChatResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(FeedloopError::Validation("Query is required".to_string()));
        }

        let start = Instant::now();
        let vector = self.embedder.embed_query(query).await?;

        let (documents, candidates) = tokio::join!(
            self.retrieve_documents(&vector),
            self.retrieve_feedback(&vector)
        );

        let rendered = build_prompt(&PromptContext {
            query,
            documents: &documents,
            history: &request.chat_history,
            candidates: &candidates,
            user_role: request.user_role,
            filter: ApplicabilityFilter::from(&self.retrieval),
        });

        debug!(
            documents = documents.len(),
            candidates = candidates.len(),
            applied = rendered.applied_feedback.len(),
            prompt_len = rendered.prompt.len(),
            "Prompt assembled"
        );

        let completion = self.llm.complete(&rendered.prompt).await?;

        info!(
            role = %request.user_role,
            documents = documents.len(),
            applied_feedback = rendered.applied_feedback.len(),
            simulated = completion.simulated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Chat answered"
        );

        Ok(ChatResponse {
            answer: completion.text,
            used_documents: documents,
            applied_feedback: rendered.applied_feedback,
            prompt: rendered.prompt,
            simulated: completion.simulated,
        })
    }

    async fn retrieve_documents(&self, vector: &[f32]) -> Vec<SourceDocument> {
        match self
            .documents
            .search(vector, self.retrieval.document_limit)
            .await
        {
            Ok(hits) => hits
                .into_iter()
                .map(|hit| SourceDocument::from_hit(hit.content, &hit.metadata, hit.distance))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Document search failed; answering without documents");
                Vec::new()
            }
        }
    }

    async fn retrieve_feedback(&self, vector: &[f32]) -> Vec<RetrievedFeedback> {
        match self
            .feedback
            .search_with_vector(vector, self.retrieval.feedback_limit)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Feedback search failed; answering without feedback");
                Vec::new()
            }
        }
    }
}
