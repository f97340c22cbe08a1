//! Document ingestion DTOs for the v1 API.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{IngestSummary, LoadedDocument};

/// Request body for `POST /v1/documents`.
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct IngestDocumentsRequest {
    /// Plain-text documents to index (1-600 items).
    #[validate(length(min = 1, max = 600), nested)]
    pub documents: Vec<DocumentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct DocumentItem {
    /// Label stored with every chunk, usually a file name.
    #[validate(length(min = 1, max = 255))]
    pub source: String,
    pub content: String,
}

impl From<DocumentItem> for LoadedDocument {
    fn from(item: DocumentItem) -> Self {
        Self {
            source: item.source,
            text: item.content,
        }
    }
}

/// Response body for document ingestion and upload.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestDocumentsResponse {
    pub chunks_added: usize,
    pub files: Vec<String>,
}

impl From<IngestSummary> for IngestDocumentsResponse {
    fn from(summary: IngestSummary) -> Self {
        Self {
            chunks_added: summary.chunks_added,
            files: summary.files,
        }
    }
}
