//! Envelope shared by every v1 endpoint: `data` on success, `error` on
//! failure, optional `meta`.
//!
//! ```json
//! { "data": { "answer": "..." } }
//! { "error": { "code": "upstream_timeout", "message": "..." } }
//! ```
//!
//! Model and embedding failures surface as `upstream_*`. Anything else that is
//! not the caller's fault becomes `internal_error` with a fixed message; the
//! cause is logged, not returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::FeedloopError;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Machine-readable error code, `snake_case` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed body, unknown role, blank query, unsupported file.
    InvalidRequest,
    /// Upload over `MAX_UPLOAD_BYTES`.
    PayloadTooLarge,
    InternalError,
    NotImplemented,
    /// The language model or embedding API rejected or failed the call.
    UpstreamError,
    /// The language model did not answer in time.
    UpstreamTimeout,
}

impl ErrorCode {
    fn parts(self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidRequest => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Self::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            Self::NotImplemented => (StatusCode::NOT_IMPLEMENTED, "not_implemented"),
            Self::UpstreamError => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Self::UpstreamTimeout => (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }

    pub fn as_str(&self) -> &'static str {
        self.parts().1
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error payload within the API envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to show to end users.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Canonical v1 API response envelope.
///
/// On success `data` is present and `error` is absent; on error the reverse.
/// The HTTP status comes from the error code, or from the constructor used
/// on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    fn with_data(data: T, meta: Option<ResponseMeta>, status: StatusCode) -> Self {
        Self {
            data: Some(data),
            meta,
            error: None,
            status,
        }
    }

    pub fn success(data: T) -> Self {
        Self::with_data(data, None, StatusCode::OK)
    }

    pub fn success_with_meta(data: T, meta: ResponseMeta) -> Self {
        Self::with_data(data, Some(meta), StatusCode::OK)
    }

    pub fn created(data: T) -> Self {
        Self::with_data(data, None, StatusCode::CREATED)
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            data: None,
            meta: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status: code.status(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                let body = serde_json::json!({
                    "error": { "code": ErrorCode::InternalError.as_str(), "message": INTERNAL_MESSAGE }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

fn rate_limit_message(retry_after: Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!("Upstream rate limit exceeded, retry after {secs} seconds"),
        None => "Upstream rate limit exceeded".to_string(),
    }
}

impl<T: Serialize> From<FeedloopError> for ApiResponse<T> {
    fn from(err: FeedloopError) -> Self {
        match err {
            FeedloopError::Validation(ref msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg.clone())
            }

            FeedloopError::UnsupportedFileType(ref msg) => ApiResponse::error(
                ErrorCode::InvalidRequest,
                format!("Unsupported file type: {msg}. Supported: .txt, .md, .json, .pdf"),
            ),

            FeedloopError::LlmUnavailable(ref msg) => {
                ApiResponse::error(ErrorCode::NotImplemented, msg.clone())
            }

            FeedloopError::LlmTimeout { timeout_secs } => {
                ApiResponse::error(
                    ErrorCode::UpstreamTimeout,
                    format!("The language model did not respond within {timeout_secs} seconds"),
                )
            }

            FeedloopError::ApiRateLimit { retry_after }
            | FeedloopError::LlmRateLimit { retry_after } => {
                ApiResponse::error(ErrorCode::UpstreamError, rate_limit_message(retry_after))
            }

            ref upstream @ (FeedloopError::Llm(_)
            | FeedloopError::Http(_)
            | FeedloopError::ApiAuth(_)) => {
                tracing::error!(error = %upstream, "Model service call failed");
                ApiResponse::error(
                    ErrorCode::UpstreamError,
                    "An upstream model service failed",
                )
            }

            ref internal @ (FeedloopError::Embedding(_)
            | FeedloopError::Processing(_)
            | FeedloopError::Ledger(_)
            | FeedloopError::VectorStore(_)
            | FeedloopError::Json(_)
            | FeedloopError::Io(_)
            | FeedloopError::Internal(_)) => {
                tracing::error!(error = %internal, "Request failed with an internal error");
                ApiResponse::error(ErrorCode::InternalError, INTERNAL_MESSAGE)
            }
        }
    }
}
