use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use super::lexical::{coverage, jaccard, tokenize};
use crate::config::RetrievalConfig;
use crate::models::{FeedbackSnippet, RetrievedFeedback, SourceDocument};

/// Lexical gate deciding which feedback applies to the current exchange.
///
/// A candidate survives only if its original query resembles the current one
/// and its words show up in at least one retrieved document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplicabilityFilter {
    pub query_similarity_threshold: f32,
    pub document_relevance_threshold: f32,
}

impl Default for ApplicabilityFilter {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for ApplicabilityFilter {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            query_similarity_threshold: config.query_similarity_threshold,
            document_relevance_threshold: config.document_relevance_threshold,
        }
    }
}

struct Applicable<'a> {
    candidate: &'a RetrievedFeedback,
    combined_score: f32,
    order: usize,
}

impl ApplicabilityFilter {
    /// Select at most one applicable feedback entry.
    ///
    /// Survivors are ranked by role weight, then recency, then combined
    /// lexical score, then their position in `candidates`.
    pub fn select(
        &self,
        query: &str,
        documents: &[SourceDocument],
        candidates: &[RetrievedFeedback],
    ) -> Vec<FeedbackSnippet> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || documents.is_empty() || candidates.is_empty() {
            return Vec::new();
        }

        let document_tokens: Vec<HashSet<String>> =
            documents.iter().map(|doc| tokenize(&doc.content)).collect();

        let mut survivors: Vec<Applicable<'_>> = Vec::new();
        for (order, candidate) in candidates.iter().enumerate() {
            let feedback_tokens = tokenize(&candidate.entry.query);
            let query_similarity = jaccard(&query_tokens, &feedback_tokens);
            if query_similarity < self.query_similarity_threshold {
                continue;
            }

            let best = document_tokens
                .iter()
                .map(|doc| coverage(doc, &feedback_tokens))
                .filter(|relevance| *relevance >= self.document_relevance_threshold)
                .map(|relevance| query_similarity + relevance)
                .max_by(|a, b| a.total_cmp(b));

            if let Some(combined_score) = best {
                survivors.push(Applicable {
                    candidate,
                    combined_score,
                    order,
                });
            }
        }

        survivors.sort_by(|a, b| {
            b.candidate
                .weight
                .cmp(&a.candidate.weight)
                .then_with(|| b.candidate.entry.created_at.cmp(&a.candidate.entry.created_at))
                .then_with(|| {
                    b.combined_score
                        .partial_cmp(&a.combined_score)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.order.cmp(&b.order))
        });

        debug!(
            candidates = candidates.len(),
            applicable = survivors.len(),
            "Applicability filter evaluated feedback"
        );

        survivors
            .into_iter()
            .take(1)
            .map(|survivor| FeedbackSnippet::from(survivor.candidate.clone()))
            .collect()
    }
}
