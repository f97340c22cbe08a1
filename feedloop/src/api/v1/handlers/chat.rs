//! v1 Chat handler.

use axum::extract::State;

use crate::api::extractors::ValidatedJson;
use crate::api::v1::dto::{ChatRequest, ChatResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

/// `POST /api/v1/chat`
///
/// Answers from the retrieved documents, steered by at most one applicable
/// feedback entry. Without a configured language model the answer is a
/// placeholder and `simulated` is `true`.
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    tag = "chat",
    operation_id = "chat.answer",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer with its sources", body = ChatResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 502, description = "Language model failed", body = ApiError),
        (status = 504, description = "Language model timed out", body = ApiError),
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ChatRequest>,
) -> ApiResponse<ChatResponse> {
    if req.query.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Query cannot be empty");
    }

    match state.chat.answer(req.into()).await {
        Ok(response) => ApiResponse::success(response.into()),
        Err(e) => e.into(),
    }
}
