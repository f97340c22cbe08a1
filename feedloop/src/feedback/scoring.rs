use std::cmp::Ordering;

use tracing::warn;

use crate::models::{FeedbackEntry, RetrievedFeedback};
use crate::store::VectorHit;

/// Map a non-negative distance onto (0, 1]. Negative distances count as 0.
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Project store hits into scored feedback, keeping store order.
///
/// Hits whose metadata no longer describes a valid entry are skipped.
pub fn score_hits(hits: Vec<VectorHit>) -> Vec<RetrievedFeedback> {
    hits.into_iter()
        .filter_map(|hit| {
            match FeedbackEntry::from_projection(&hit.content, &hit.metadata) {
                Ok(entry) => {
                    let role = entry.user_role;
                    Some(RetrievedFeedback {
                        entry,
                        score: distance_to_similarity(hit.distance) + role.boost(),
                        weight: role.weight(),
                    })
                }
                Err(e) => {
                    warn!(record = %hit.id, error = %e, "Skipping malformed feedback projection");
                    None
                }
            }
        })
        .collect()
}

/// Order by weight, then score, both descending. The sort is stable.
pub fn rank_candidates(mut candidates: Vec<RetrievedFeedback>) -> Vec<RetrievedFeedback> {
    candidates.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, UserRole};

    fn hit(entry: &FeedbackEntry, distance: f32) -> VectorHit {
        VectorHit {
            id: entry.id.to_string(),
            content: entry.updated_response.clone(),
            metadata: entry.projection_metadata(),
            distance,
        }
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(distance_to_similarity(0.0), 1.0);
        assert_eq!(distance_to_similarity(-3.0), 1.0);
        assert_eq!(distance_to_similarity(1.0), 0.5);

        let mut previous = distance_to_similarity(0.0);
        for step in 1..50 {
            let current = distance_to_similarity(step as f32 * 0.37);
            assert!(current > 0.0 && current <= 1.0);
            assert!(current < previous);
            previous = current;
        }
    }

    #[test]
    fn test_score_adds_role_boost() {
        let owner = FeedbackEntry::new("q", "r", "u", UserRole::Owner);
        let scored = score_hits(vec![hit(&owner, 1.0)]);

        assert_eq!(scored.len(), 1);
        assert!((scored[0].score - 1.1).abs() < 1e-6);
        assert_eq!(scored[0].weight, 3);
    }

    #[test]
    fn test_malformed_hit_is_skipped() {
        let good = FeedbackEntry::new("q", "r", "u", UserRole::Driver);
        let broken = VectorHit {
            id: "broken".to_string(),
            content: "text".to_string(),
            metadata: Metadata::new(),
            distance: 0.0,
        };

        let scored = score_hits(vec![broken, hit(&good, 0.5)]);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].entry.id, good.id);
    }

    #[test]
    fn test_weight_dominates_score() {
        let driver = FeedbackEntry::new("q", "r", "driver says", UserRole::Driver);
        let owner = FeedbackEntry::new("q", "r", "owner says", UserRole::Owner);

        // The driver hit is an exact match, the owner hit is far away.
        let ranked = rank_candidates(score_hits(vec![hit(&driver, 0.0), hit(&owner, 100.0)]));

        assert_eq!(ranked[0].entry.user_role, UserRole::Owner);
        assert_eq!(ranked[1].entry.user_role, UserRole::Driver);
    }

    #[test]
    fn test_equal_weight_orders_by_score() {
        let near = FeedbackEntry::new("q", "r", "near", UserRole::Manager);
        let far = FeedbackEntry::new("q", "r", "far", UserRole::Manager);

        let ranked = rank_candidates(score_hits(vec![hit(&far, 4.0), hit(&near, 0.1)]));
        assert_eq!(ranked[0].entry.updated_response, "near");
    }
}
