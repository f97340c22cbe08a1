//! Feedback request/response DTOs for the v1 API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::V1UserRole;
use crate::models::FeedbackEntry;

/// Request body for `POST /v1/feedback`.
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    /// The question that was asked.
    #[validate(length(min = 1))]
    pub query: String,
    /// The answer the system gave.
    pub response: String,
    /// The corrected answer.
    #[validate(length(min = 1))]
    pub updated_response: String,
    /// Role of the person submitting the correction.
    pub user_role: V1UserRole,
}

impl From<CreateFeedbackRequest> for FeedbackEntry {
    fn from(req: CreateFeedbackRequest) -> Self {
        FeedbackEntry::new(
            req.query,
            req.response,
            req.updated_response,
            req.user_role.into(),
        )
    }
}

/// A stored correction.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntryResponse {
    /// UUID v4.
    pub id: String,
    pub query: String,
    pub response: String,
    pub updated_response: String,
    pub user_role: V1UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<FeedbackEntry> for FeedbackEntryResponse {
    fn from(entry: FeedbackEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            query: entry.query,
            response: entry.response,
            updated_response: entry.updated_response,
            user_role: entry.user_role.into(),
            created_at: entry.created_at,
        }
    }
}

/// Response body for `POST /v1/feedback`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CreateFeedbackResponse {
    pub entry: FeedbackEntryResponse,
}

/// Response body for `GET /v1/feedback`. Entries are in submission order.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ListFeedbackResponse {
    pub feedback: Vec<FeedbackEntryResponse>,
}
