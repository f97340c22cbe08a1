use std::path::PathBuf;
use std::sync::Arc;

use nanoid::nanoid;
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::error::{FeedloopError, Result};
use crate::models::{IngestSummary, LoadedDocument};
use crate::processing::{load_bytes, sanitize_file_name, DocumentChunker, DocumentFormat};
use crate::store::{VectorRecord, VectorStore};

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Loads, chunks, embeds and indexes documents.
#[derive(Clone)]
pub struct IngestService {
    documents: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunker: DocumentChunker,
    upload_dir: PathBuf,
}

impl IngestService {
    pub fn new(
        documents: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chunker: DocumentChunker,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            documents,
            embedder,
            chunker,
            upload_dir: upload_dir.into(),
        }
    }

    pub async fn document_count(&self) -> usize {
        self.documents.len().await
    }

    /// Chunk and index already-loaded documents.
    pub async fn ingest(&self, documents: Vec<LoadedDocument>) -> Result<IngestSummary> {
        let mut files: Vec<String> = Vec::new();
        for document in &documents {
            if !files.contains(&document.source) {
                files.push(document.source.clone());
            }
        }

        let chunks = self.chunker.chunk_all(&documents);
        if chunks.is_empty() {
            debug!(files = files.len(), "Nothing to index");
            return Ok(IngestSummary {
                chunks_added: 0,
                files,
            });
        }

        let texts = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = self.embedder.embed_passages(texts).await?;

        let records = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord {
                id: nanoid!(),
                metadata: chunk.metadata(),
                content: chunk.content,
                vector,
            })
            .collect();

        let chunks_added = self.documents.upsert(records).await?;
        info!(chunks_added, files = ?files, "Documents indexed");

        Ok(IngestSummary {
            chunks_added,
            files,
        })
    }

    /// Store uploaded files under the upload directory, then load and index them.
    ///
    /// Every file is validated before anything is written, so an unsupported
    /// file in the batch rejects the whole batch.
    pub async fn ingest_uploads(&self, uploads: Vec<UploadedFile>) -> Result<IngestSummary> {
        if uploads.is_empty() {
            return Err(FeedloopError::Validation(
                "At least one file is required".to_string(),
            ));
        }

        let mut named = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let file_name = sanitize_file_name(&upload.file_name)?;
            DocumentFormat::from_file_name(&file_name)?;
            named.push((file_name, upload.bytes));
        }

        let upload_dir = self.upload_dir.clone();
        let loaded = tokio::task::spawn_blocking(move || -> Result<Vec<LoadedDocument>> {
            std::fs::create_dir_all(&upload_dir)?;
            let mut loaded = Vec::new();
            for (file_name, bytes) in named {
                std::fs::write(upload_dir.join(&file_name), &bytes)?;
                loaded.extend(load_bytes(&file_name, &bytes)?);
            }
            Ok(loaded)
        })
        .await
        .map_err(|e| FeedloopError::Internal(format!("Upload task failed: {e}")))??;

        self.ingest(loaded).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::embeddings::HashingEmbedder;
    use crate::store::PersistentIndex;
    use tempfile::TempDir;

    async fn service(dir: &TempDir) -> (IngestService, Arc<PersistentIndex>) {
        let embedder = Arc::new(HashingEmbedder::new(64).unwrap());
        let index = Arc::new(
            PersistentIndex::open("documents", dir.path().join("vector_store/index.json"), 64)
                .await,
        );
        let chunker = DocumentChunker::new(&ProcessingConfig {
            chunk_size: 800,
            chunk_overlap: 120,
            max_upload_bytes: 1024 * 1024,
        });
        let service = IngestService::new(
            index.clone(),
            embedder,
            chunker,
            dir.path().join("uploads"),
        );
        (service, index)
    }

    #[tokio::test]
    async fn test_ingest_indexes_chunks() {
        let dir = TempDir::new().unwrap();
        let (service, index) = service(&dir).await;

        let summary = service
            .ingest(vec![LoadedDocument {
                source: "policies.md".to_string(),
                text: "The fuel surcharge applies above 500 miles.".to_string(),
            }])
            .await
            .unwrap();

        assert_eq!(summary.chunks_added, 1);
        assert_eq!(summary.files, vec!["policies.md".to_string()]);
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_blank_documents_index_nothing() {
        let dir = TempDir::new().unwrap();
        let (service, index) = service(&dir).await;

        let summary = service
            .ingest(vec![LoadedDocument {
                source: "empty.txt".to_string(),
                text: "  ".to_string(),
            }])
            .await
            .unwrap();

        assert_eq!(summary.chunks_added, 0);
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_uploads_are_stored_and_indexed() {
        let dir = TempDir::new().unwrap();
        let (service, index) = service(&dir).await;

        let summary = service
            .ingest_uploads(vec![UploadedFile {
                file_name: "../routes.txt".to_string(),
                bytes: b"Drivers must log every stop.".to_vec(),
            }])
            .await
            .unwrap();

        assert_eq!(summary.files, vec!["routes.txt".to_string()]);
        assert_eq!(index.len().await, 1);
        assert!(dir.path().join("uploads/routes.txt").exists());
    }

    #[tokio::test]
    async fn test_unsupported_upload_rejects_batch() {
        let dir = TempDir::new().unwrap();
        let (service, index) = service(&dir).await;

        let err = service
            .ingest_uploads(vec![
                UploadedFile {
                    file_name: "routes.txt".to_string(),
                    bytes: b"ok".to_vec(),
                },
                UploadedFile {
                    file_name: "sheet.xlsx".to_string(),
                    bytes: vec![1, 2, 3],
                },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, FeedloopError::UnsupportedFileType(_)));
        assert!(index.is_empty().await);
        assert!(!dir.path().join("uploads/routes.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir).await;

        assert!(matches!(
            service.ingest_uploads(Vec::new()).await,
            Err(FeedloopError::Validation(_))
        ));
    }
}
