//! v1 API Data Transfer Objects.
//!
//! Wire types for the v1 REST API, kept separate from the domain models in
//! `src/models/`. Field names are camelCase on the wire.

pub mod chat;
pub mod common;
pub mod documents;
pub mod feedback;

pub use chat::*;
pub use common::*;
pub use documents::*;
pub use feedback::*;
