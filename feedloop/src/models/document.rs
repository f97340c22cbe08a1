use serde::{Deserialize, Serialize};

use super::Metadata;

pub const META_SOURCE: &str = "source";

/// A retrieved document chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source: Option<String>,
    pub content: String,
    /// Raw store distance; lower is closer.
    pub score: Option<f32>,
}

impl SourceDocument {
    pub fn from_hit(content: String, metadata: &Metadata, distance: f32) -> Self {
        Self {
            source: metadata
                .get(META_SOURCE)
                .filter(|source| !source.is_empty())
                .cloned(),
            content,
            score: Some(distance),
        }
    }
}

/// Already-loaded text with the label of where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub source: String,
    pub text: String,
}

/// A chunk ready to be embedded into the document index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub source: String,
    pub content: String,
    pub position: usize,
}

impl DocumentChunk {
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(META_SOURCE.to_string(), self.source.clone());
        metadata.insert("position".to_string(), self.position.to_string());
        metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub chunks_added: usize,
    pub files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_document_from_hit() {
        let chunk = DocumentChunk {
            source: "policy.md".to_string(),
            content: "fuel surcharge applies above 500 miles".to_string(),
            position: 3,
        };

        let doc = SourceDocument::from_hit(chunk.content.clone(), &chunk.metadata(), 0.25);
        assert_eq!(doc.source.as_deref(), Some("policy.md"));
        assert_eq!(doc.score, Some(0.25));
    }

    #[test]
    fn test_empty_source_is_unknown() {
        let mut metadata = Metadata::new();
        metadata.insert(META_SOURCE.to_string(), String::new());

        let doc = SourceDocument::from_hit("text".to_string(), &metadata, 1.0);
        assert!(doc.source.is_none());
    }
}
