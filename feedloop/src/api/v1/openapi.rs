use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Feedloop API",
        version = "1.0.0",
        description = "Document question answering where expert feedback outranks the corpus.",
    ),
    paths(
        handlers::health::health_check,
        handlers::chat::chat,
        handlers::feedback::create_feedback,
        handlers::feedback::list_feedback,
        handlers::documents::create_documents,
        handlers::documents::upload_documents,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        // Common
        dto::common::V1UserRole,
        dto::common::V1ChatRole,
        // Chat
        dto::chat::ChatRequest,
        dto::chat::ChatMessageDto,
        dto::chat::ChatResponse,
        dto::chat::SourceDocumentResponse,
        dto::chat::FeedbackSnippetResponse,
        // Feedback
        dto::feedback::CreateFeedbackRequest,
        dto::feedback::CreateFeedbackResponse,
        dto::feedback::FeedbackEntryResponse,
        dto::feedback::ListFeedbackResponse,
        // Documents
        dto::documents::IngestDocumentsRequest,
        dto::documents::DocumentItem,
        dto::documents::IngestDocumentsResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::EmbeddingsStatus,
        handlers::health::LlmStatus,
        handlers::health::IndexStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "chat", description = "Question answering over documents and feedback"),
        (name = "feedback", description = "Expert corrections"),
        (name = "documents", description = "Document ingestion and upload"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
