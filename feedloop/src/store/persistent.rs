use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{snapshot, IndexState, VectorHit, VectorRecord, VectorStore};
use crate::error::{FeedloopError, Result};

/// Flat index persisted as a JSON snapshot after every mutation.
///
/// Mutations hold the write guard across insert and persist. If persisting
/// fails the previous state is restored, so readers never see a record that
/// is not on disk.
pub struct PersistentIndex {
    name: String,
    path: PathBuf,
    dimensions: usize,
    state: RwLock<IndexState>,
}

impl PersistentIndex {
    /// Open the index at `path`.
    ///
    /// A missing, corrupt, or incompatible snapshot yields an empty index.
    pub async fn open(name: &str, path: impl Into<PathBuf>, dimensions: usize) -> Self {
        let path = path.into();
        let load_path = path.clone();
        let loaded =
            tokio::task::spawn_blocking(move || snapshot::load(&load_path, dimensions)).await;

        let state = match loaded {
            Ok(Ok(Some(state))) => {
                info!(store = name, records = state.len(), path = %path.display(), "Loaded vector index");
                state
            }
            Ok(Ok(None)) => {
                debug!(store = name, path = %path.display(), "No vector index on disk yet");
                IndexState::Empty
            }
            Ok(Err(e)) => {
                warn!(store = name, path = %path.display(), error = %e, "Ignoring unusable vector index; starting empty");
                IndexState::Empty
            }
            Err(e) => {
                warn!(store = name, error = %e, "Vector index load task failed; starting empty");
                IndexState::Empty
            }
        };

        Self {
            name: name.to_string(),
            path,
            dimensions,
            state: RwLock::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn persist(&self, state: IndexState) -> Result<IndexState> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || snapshot::save(&path, &state).map(|()| state))
            .await
            .map_err(|e| FeedloopError::Internal(format!("Snapshot task failed: {e}")))?
    }
}

#[async_trait]
impl VectorStore for PersistentIndex {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        let state = self.state.read().await;
        state.search(query, k)
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dimensions) {
            return Err(FeedloopError::VectorStore(format!(
                "Record {} has {} dimensions, store '{}' expects {}",
                bad.id,
                bad.vector.len(),
                self.name,
                self.dimensions
            )));
        }

        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let count = next.upsert(records)?;

        let next = self.persist(next).await?;
        *guard = next;

        debug!(store = %self.name, upserted = count, total = guard.len(), "Vector index updated");
        Ok(count)
    }

    async fn contains(&self, id: &str) -> bool {
        self.state.read().await.contains(id)
    }

    async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.state.write().await;
        self.persist(IndexState::Empty).await?;
        *guard = IndexState::Empty;
        info!(store = %self.name, "Vector index cleared");
        Ok(())
    }
}
