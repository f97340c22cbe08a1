//! Turning uploaded files into indexable chunks.

mod chunker;
mod loader;

pub use chunker::DocumentChunker;
pub use loader::{load_bytes, sanitize_file_name, DocumentFormat};
