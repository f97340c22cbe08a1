use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};
use tracing::warn;

use super::loader::DocumentFormat;
use crate::config::ProcessingConfig;
use crate::models::{DocumentChunk, LoadedDocument};

/// Splits loaded documents into overlapping, character-bounded chunks.
#[derive(Debug, Clone, Copy)]
pub struct DocumentChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentChunker {
    pub fn new(config: &ProcessingConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        let chunk_overlap = if config.chunk_overlap >= chunk_size {
            warn!(
                chunk_size,
                chunk_overlap = config.chunk_overlap,
                "Chunk overlap must be smaller than chunk size; disabling overlap"
            );
            0
        } else {
            config.chunk_overlap
        };

        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Chunk every document, numbering chunks per source. Blank chunks are dropped.
    pub fn chunk_all(&self, documents: &[LoadedDocument]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        let mut position = 0;
        let mut last_source: Option<&str> = None;

        for document in documents {
            if last_source != Some(document.source.as_str()) {
                position = 0;
                last_source = Some(document.source.as_str());
            }
            for content in self.split(document) {
                chunks.push(DocumentChunk {
                    source: document.source.clone(),
                    content,
                    position,
                });
                position += 1;
            }
        }
        chunks
    }

    fn split(&self, document: &LoadedDocument) -> Vec<String> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let markdown = matches!(
            DocumentFormat::from_file_name(&document.source),
            Ok(DocumentFormat::Markdown)
        );

        let config = match ChunkConfig::new(self.chunk_size).with_overlap(self.chunk_overlap) {
            Ok(config) => config,
            Err(_) => ChunkConfig::new(self.chunk_size),
        };

        if markdown {
            collect(MarkdownSplitter::new(config).chunks(&document.text))
        } else {
            collect(TextSplitter::new(config).chunks(&document.text))
        }
    }
}

fn collect<'a>(chunks: impl Iterator<Item = &'a str>) -> Vec<String> {
    chunks
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}
