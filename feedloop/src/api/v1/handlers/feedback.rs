//! v1 Feedback handlers.

use axum::extract::State;

use crate::api::extractors::ValidatedJson;
use crate::api::v1::dto::{
    CreateFeedbackRequest, CreateFeedbackResponse, FeedbackEntryResponse, ListFeedbackResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode, ResponseMeta};
use crate::api::AppState;

/// `POST /api/v1/feedback`
///
/// Records a correction. The entry is durable once this returns 201; indexing
/// it for retrieval is best effort and is retried at the next startup.
#[utoipa::path(
    post,
    path = "/api/v1/feedback",
    tag = "feedback",
    operation_id = "feedback.create",
    request_body = CreateFeedbackRequest,
    responses(
        (status = 201, description = "Feedback recorded", body = CreateFeedbackResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_feedback(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateFeedbackRequest>,
) -> ApiResponse<CreateFeedbackResponse> {
    if req.query.trim().is_empty() || req.updated_response.trim().is_empty() {
        return ApiResponse::error(
            ErrorCode::InvalidRequest,
            "query and updatedResponse cannot be empty",
        );
    }

    match state.feedback.add(req.into()).await {
        Ok(entry) => ApiResponse::created(CreateFeedbackResponse {
            entry: entry.into(),
        }),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/feedback`
#[utoipa::path(
    get,
    path = "/api/v1/feedback",
    tag = "feedback",
    operation_id = "feedback.list",
    responses(
        (status = 200, description = "All recorded feedback in submission order", body = ListFeedbackResponse),
    )
)]
pub async fn list_feedback(State(state): State<AppState>) -> ApiResponse<ListFeedbackResponse> {
    let feedback: Vec<FeedbackEntryResponse> = state
        .feedback
        .list()
        .await
        .into_iter()
        .map(Into::into)
        .collect();
    let total = feedback.len() as u64;

    ApiResponse::success_with_meta(
        ListFeedbackResponse { feedback },
        ResponseMeta { total: Some(total) },
    )
}
