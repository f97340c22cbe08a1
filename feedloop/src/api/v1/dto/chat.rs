//! Chat request/response DTOs for the v1 API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::{V1ChatRole, V1UserRole};
use crate::models;

/// Request body for `POST /v1/chat`.
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The question to answer. Must contain at least one non-whitespace character.
    #[validate(length(min = 1, max = 10_000))]
    pub query: String,
    /// Role of the person asking.
    pub user_role: V1UserRole,
    /// Earlier turns of the conversation, oldest first.
    #[serde(default)]
    pub chat_history: Vec<ChatMessageDto>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ChatMessageDto {
    pub role: V1ChatRole,
    pub content: String,
}

impl From<ChatRequest> for models::ChatRequest {
    fn from(req: ChatRequest) -> Self {
        Self {
            query: req.query,
            user_role: req.user_role.into(),
            chat_history: req
                .chat_history
                .into_iter()
                .map(|message| models::ChatMessage {
                    role: message.role.into(),
                    content: message.content,
                })
                .collect(),
        }
    }
}

/// A retrieved document chunk used to answer.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocumentResponse {
    /// File name the chunk came from, when known.
    pub source: Option<String>,
    pub content: String,
    /// Raw store distance; lower is closer.
    pub score: Option<f32>,
}

impl From<models::SourceDocument> for SourceDocumentResponse {
    fn from(doc: models::SourceDocument) -> Self {
        Self {
            source: doc.source,
            content: doc.content,
            score: doc.score,
        }
    }
}

/// Feedback that was judged applicable and injected into the prompt.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSnippetResponse {
    pub id: String,
    pub query: String,
    pub response: String,
    pub updated_response: String,
    pub user_role: V1UserRole,
    /// Vector similarity plus the role boost.
    pub score: f32,
    pub weight: u8,
    pub created_at: DateTime<Utc>,
}

impl From<models::FeedbackSnippet> for FeedbackSnippetResponse {
    fn from(snippet: models::FeedbackSnippet) -> Self {
        Self {
            id: snippet.id.to_string(),
            query: snippet.query,
            response: snippet.response,
            updated_response: snippet.updated_response,
            user_role: snippet.user_role.into(),
            score: snippet.score,
            weight: snippet.weight,
            created_at: snippet.created_at,
        }
    }
}

/// Response body for `POST /v1/chat`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub answer: String,
    pub used_documents: Vec<SourceDocumentResponse>,
    /// At most one entry.
    pub applied_feedback: Vec<FeedbackSnippetResponse>,
    /// The exact prompt sent to the language model.
    pub prompt: String,
    /// `true` when no language model is configured and `answer` is a placeholder.
    pub simulated: bool,
}

impl From<models::ChatResponse> for ChatResponse {
    fn from(resp: models::ChatResponse) -> Self {
        Self {
            answer: resp.answer,
            used_documents: resp.used_documents.into_iter().map(Into::into).collect(),
            applied_feedback: resp.applied_feedback.into_iter().map(Into::into).collect(),
            prompt: resp.prompt,
            simulated: resp.simulated,
        }
    }
}
