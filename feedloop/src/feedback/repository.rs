use std::sync::Arc;

use tracing::{debug, info, warn};

use super::ledger::FeedbackLedger;
use super::scoring::{rank_candidates, score_hits};
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::models::{FeedbackEntry, RetrievedFeedback};
use crate::store::{VectorRecord, VectorStore};

/// Ledger plus its derived vector projection.
///
/// The ledger is written first and is authoritative; the index can always be
/// rebuilt from it.
pub struct FeedbackRepository {
    ledger: Arc<FeedbackLedger>,
    index: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl FeedbackRepository {
    pub fn new(
        ledger: Arc<FeedbackLedger>,
        index: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            ledger,
            index,
            embedder,
        }
    }

    /// Record a correction. Fails only if the ledger write fails.
    pub async fn add(&self, entry: FeedbackEntry) -> Result<FeedbackEntry> {
        let entry = self.ledger.append(entry).await?;
        info!(id = %entry.id, role = %entry.user_role, "Feedback recorded");

        if let Err(e) = self.project(std::slice::from_ref(&entry)).await {
            warn!(
                id = %entry.id,
                error = %e,
                "Feedback saved to ledger but not indexed; it will be re-indexed on next reconcile"
            );
        }

        Ok(entry)
    }

    pub async fn list(&self) -> Vec<FeedbackEntry> {
        self.ledger.list().await
    }

    pub async fn ledger_len(&self) -> usize {
        self.ledger.len().await
    }

    pub async fn index_len(&self) -> usize {
        self.index.len().await
    }

    /// Embed `query` and return up to `limit` candidates ordered by
    /// (weight, score) descending.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedFeedback>> {
        let vector = self.embedder.embed_query(query).await?;
        self.search_with_vector(&vector, limit).await
    }

    /// Same as [`search`](Self::search) with a precomputed query embedding.
    pub async fn search_with_vector(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedFeedback>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let hits = self.index.search(vector, limit).await?;
        let ranked = rank_candidates(score_hits(hits));
        debug!(candidates = ranked.len(), "Feedback candidates retrieved");
        Ok(ranked)
    }

    /// Index every ledger entry missing from the vector projection.
    pub async fn reconcile(&self) -> Result<usize> {
        let mut missing = Vec::new();
        for entry in self.ledger.list().await {
            if !self.index.contains(&entry.id.to_string()).await {
                missing.push(entry);
            }
        }

        if missing.is_empty() {
            debug!("Feedback index is in sync with the ledger");
            return Ok(0);
        }

        let count = self.project(&missing).await?;
        info!(reindexed = count, "Reconciled feedback index with ledger");
        Ok(count)
    }

    /// Drop the vector projection and rebuild it from the whole ledger.
    pub async fn rebuild(&self) -> Result<usize> {
        self.index.clear().await?;
        let entries = self.ledger.list().await;
        let count = self.project(&entries).await?;
        info!(entries = count, "Rebuilt feedback index from ledger");
        Ok(count)
    }

    async fn project(&self, entries: &[FeedbackEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let texts = entries
            .iter()
            .map(|entry| entry.updated_response.clone())
            .collect();
        let vectors = self.embedder.embed_passages(texts).await?;

        let records = entries
            .iter()
            .zip(vectors)
            .map(|(entry, vector)| VectorRecord {
                id: entry.id.to_string(),
                content: entry.updated_response.clone(),
                metadata: entry.projection_metadata(),
                vector,
            })
            .collect();

        self.index.upsert(records).await
    }
}
