//! Expert feedback: the durable ledger, its vector projection, role-weighted
//! scoring, and the lexical applicability gate.

mod applicability;
mod ledger;
pub mod lexical;
mod repository;
mod scoring;

pub use applicability::ApplicabilityFilter;
pub use ledger::FeedbackLedger;
pub use repository::FeedbackRepository;
pub use scoring::{distance_to_similarity, rank_candidates, score_hits};
