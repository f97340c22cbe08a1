mod chat;
mod ingest;

pub use chat::ChatService;
pub use ingest::{IngestService, UploadedFile};
