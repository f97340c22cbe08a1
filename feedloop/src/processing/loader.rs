use std::path::Path;

use serde_json::Value;

use crate::error::{FeedloopError, Result};
use crate::models::LoadedDocument;

/// File formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Markdown,
    Json,
    Pdf,
}

impl DocumentFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "txt" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            "" => Err(FeedloopError::UnsupportedFileType(format!(
                "{file_name} has no extension"
            ))),
            other => Err(FeedloopError::UnsupportedFileType(format!(".{other}"))),
        }
    }
}

/// Reduce an uploaded file name to its final path component.
pub fn sanitize_file_name(raw: &str) -> Result<String> {
    let name = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(FeedloopError::Validation(format!(
            "Invalid file name: '{raw}'"
        )));
    }
    Ok(name.to_string())
}

/// Turn raw file bytes into one or more documents labelled with `file_name`.
pub fn load_bytes(file_name: &str, bytes: &[u8]) -> Result<Vec<LoadedDocument>> {
    let format = DocumentFormat::from_file_name(file_name)?;
    let source = file_name.to_string();

    match format {
        DocumentFormat::Text | DocumentFormat::Markdown => Ok(vec![LoadedDocument {
            source,
            text: decode_utf8(file_name, bytes)?,
        }]),
        DocumentFormat::Json => {
            let text = decode_utf8(file_name, bytes)?;
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                FeedloopError::Validation(format!("{file_name} is not valid JSON: {e}"))
            })?;
            json_documents(&source, value)
        }
        DocumentFormat::Pdf => {
            let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                FeedloopError::Processing(format!("PDF extraction failed for {file_name}: {e}"))
            })?;
            Ok(vec![LoadedDocument { source, text }])
        }
    }
}

fn decode_utf8(file_name: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| FeedloopError::Validation(format!("{file_name} is not valid UTF-8 text")))
}

fn json_documents(source: &str, value: Value) -> Result<Vec<LoadedDocument>> {
    let document = |text: String| LoadedDocument {
        source: source.to_string(),
        text,
    };

    match value {
        Value::String(text) => Ok(vec![document(text)]),
        Value::Array(items) => items
            .iter()
            .map(|item| -> Result<LoadedDocument> { Ok(document(serde_json::to_string(item)?)) })
            .collect(),
        other => Ok(vec![document(serde_json::to_string(&other)?)]),
    }
}
