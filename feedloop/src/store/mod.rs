//! Vector similarity stores.
//!
//! Two instances exist at runtime: one for document chunks and one for
//! feedback projections. Both are rebuildable indexes; nothing in them is a
//! source of truth.

mod index;
mod persistent;
mod snapshot;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Metadata;

pub use index::IndexState;
pub use persistent::PersistentIndex;
pub(crate) use snapshot::write_atomic;

/// A vector with its content and metadata, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

/// A nearest-neighbour search result. Lower `distance` is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub distance: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `k` records ordered by ascending distance to `query`.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>>;

    /// Insert or replace records by id. The store is persisted before this returns.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize>;

    async fn contains(&self, id: &str) -> bool;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every record and persist the empty store.
    async fn clear(&self) -> Result<()>;
}
