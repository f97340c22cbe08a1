//! v1 Document ingestion handlers.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;

use crate::api::extractors::ValidatedJson;
use crate::api::v1::dto::{IngestDocumentsRequest, IngestDocumentsResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::services::UploadedFile;

/// `POST /api/v1/documents`
///
/// Chunks, embeds and indexes plain-text documents.
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    tag = "documents",
    operation_id = "documents.create",
    request_body = IngestDocumentsRequest,
    responses(
        (status = 201, description = "Documents indexed", body = IngestDocumentsResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn create_documents(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<IngestDocumentsRequest>,
) -> ApiResponse<IngestDocumentsResponse> {
    let documents = req.documents.into_iter().map(Into::into).collect();

    match state.ingest.ingest(documents).await {
        Ok(summary) => ApiResponse::created(summary.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/documents:upload`
///
/// Multipart upload. Every part named `files` (or `file`) is stored under the
/// upload directory, loaded by extension (`.txt`, `.md`, `.json`, `.pdf`),
/// chunked and indexed.
#[utoipa::path(
    post,
    path = "/api/v1/documents:upload",
    tag = "documents",
    operation_id = "documents.upload",
    request_body(content_type = "multipart/form-data", description = "One or more `files` parts"),
    responses(
        (status = 201, description = "Files indexed", body = IngestDocumentsResponse),
        (status = 400, description = "Invalid request or unsupported file type", body = ApiError),
        (status = 413, description = "Upload too large", body = ApiError),
    )
)]
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<IngestDocumentsResponse> {
    let mut uploads = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error(e),
        };

        if !matches!(field.name(), Some("files") | Some("file")) {
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_string) else {
            return ApiResponse::error(ErrorCode::InvalidRequest, "Every file part needs a file name");
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return multipart_error(e),
        };

        uploads.push(UploadedFile {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    if uploads.is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "No files provided");
    }

    match state.ingest.ingest_uploads(uploads).await {
        Ok(summary) => ApiResponse::created(summary.into()),
        Err(e) => e.into(),
    }
}

fn multipart_error<T: serde::Serialize>(err: MultipartError) -> ApiResponse<T> {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiResponse::error(ErrorCode::PayloadTooLarge, "Upload exceeds the size limit")
    } else {
        ApiResponse::error(
            ErrorCode::InvalidRequest,
            format!("Failed to read multipart body: {}", err.body_text()),
        )
    }
}
