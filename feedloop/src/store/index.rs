use crate::error::{FeedloopError, Result};

use super::{VectorHit, VectorRecord};

/// In-memory flat index.
///
/// A store starts `Empty` and becomes `Populated` on its first insert, at
/// which point its dimensionality is fixed.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum IndexState {
    #[default]
    Empty,
    Populated {
        dimensions: usize,
        records: Vec<VectorRecord>,
    },
}

impl IndexState {
    pub fn from_records(records: Vec<VectorRecord>) -> Result<Self> {
        let mut state = Self::Empty;
        state.upsert(records)?;
        Ok(state)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Populated { records, .. } => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> Option<usize> {
        match self {
            Self::Empty => None,
            Self::Populated { dimensions, .. } => Some(*dimensions),
        }
    }

    pub fn records(&self) -> &[VectorRecord] {
        match self {
            Self::Empty => &[],
            Self::Populated { records, .. } => records,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records().iter().any(|record| record.id == id)
    }

    /// Insert or replace records by id.
    ///
    /// The whole batch is validated before anything is applied, so a bad
    /// vector leaves the state untouched.
    pub fn upsert(&mut self, incoming: Vec<VectorRecord>) -> Result<usize> {
        let Some(first) = incoming.first() else {
            return Ok(0);
        };

        let expected = self.dimensions().unwrap_or(first.vector.len());
        if expected == 0 {
            return Err(FeedloopError::VectorStore(
                "Cannot index an empty vector".to_string(),
            ));
        }
        if let Some(bad) = incoming.iter().find(|r| r.vector.len() != expected) {
            return Err(FeedloopError::VectorStore(format!(
                "Dimension mismatch for record {}: expected {}, got {}",
                bad.id,
                expected,
                bad.vector.len()
            )));
        }

        let count = incoming.len();
        match self {
            Self::Empty => {
                let mut records: Vec<VectorRecord> = Vec::with_capacity(count);
                for record in incoming {
                    replace_or_push(&mut records, record);
                }
                *self = Self::Populated {
                    dimensions: expected,
                    records,
                };
            }
            Self::Populated { records, .. } => {
                for record in incoming {
                    replace_or_push(records, record);
                }
            }
        }

        Ok(count)
    }

    /// Exact k-nearest-neighbour search by squared Euclidean distance.
    ///
    /// Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        let Self::Populated {
            dimensions,
            records,
        } = self
        else {
            return Ok(Vec::new());
        };

        if query.len() != *dimensions {
            return Err(FeedloopError::VectorStore(format!(
                "Query dimension mismatch: index has {}, query has {}",
                dimensions,
                query.len()
            )));
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = records
            .iter()
            .enumerate()
            .map(|(idx, record)| (idx, squared_l2(query, &record.vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(idx, distance)| {
                let record = &records[idx];
                VectorHit {
                    id: record.id.clone(),
                    content: record.content.clone(),
                    metadata: record.metadata.clone(),
                    distance,
                }
            })
            .collect())
    }
}

fn replace_or_push(records: &mut Vec<VectorRecord>, record: VectorRecord) {
    match records.iter_mut().find(|existing| existing.id == record.id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn record(id: &str, vector: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            content: format!("content {id}"),
            metadata: Metadata::new(),
            vector,
        }
    }

    #[test]
    fn test_empty_state_searches_to_nothing() {
        let state = IndexState::Empty;
        assert!(state.search(&[1.0, 0.0], 3).unwrap().is_empty());
        assert_eq!(state.dimensions(), None);
    }

    #[test]
    fn test_first_insert_fixes_dimensions() {
        let mut state = IndexState::Empty;
        state.upsert(vec![record("a", vec![1.0, 0.0, 0.0])]).unwrap();

        assert_eq!(state.dimensions(), Some(3));
        assert_eq!(state.len(), 1);

        let err = state.upsert(vec![record("b", vec![1.0, 0.0])]).unwrap_err();
        assert!(err.to_string().contains("Dimension mismatch"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_batch_is_validated_before_apply() {
        let mut state = IndexState::Empty;
        let result = state.upsert(vec![record("a", vec![1.0, 0.0]), record("b", vec![1.0])]);

        assert!(result.is_err());
        assert_eq!(state, IndexState::Empty);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut state = IndexState::Empty;
        state.upsert(vec![record("a", vec![1.0, 0.0])]).unwrap();
        state.upsert(vec![record("a", vec![0.0, 1.0])]).unwrap();

        assert_eq!(state.len(), 1);
        assert_eq!(state.records()[0].vector, vec![0.0, 1.0]);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let state = IndexState::from_records(vec![
            record("far", vec![10.0, 0.0]),
            record("near", vec![1.0, 0.0]),
            record("exact", vec![0.0, 0.0]),
        ])
        .unwrap();

        let hits = state.search(&[0.0, 0.0], 2).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].distance, 1.0);
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let state = IndexState::from_records(vec![
            record("first", vec![1.0, 0.0]),
            record("second", vec![0.0, 1.0]),
        ])
        .unwrap();

        let hits = state.search(&[0.0, 0.0], 5).unwrap();
        assert_eq!(hits[0].id, "first");
        assert_eq!(hits[1].id, "second");
    }

    #[test]
    fn test_search_rejects_wrong_query_dimensions() {
        let state = IndexState::from_records(vec![record("a", vec![1.0, 0.0])]).unwrap();
        assert!(state.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_zero_length_vector_rejected() {
        let mut state = IndexState::Empty;
        assert!(state.upsert(vec![record("a", vec![])]).is_err());
    }
}
