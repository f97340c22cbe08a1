//! Document question answering where expert feedback outranks the corpus.
//!
//! Corrections submitted by drivers, managers and owners are kept in an
//! append-only ledger, projected into a vector index, and injected into the
//! prompt whenever they apply to the question and the retrieved documents.

pub mod api;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod feedback;
pub mod llm;
pub mod models;
pub mod processing;
pub mod services;
pub mod store;
