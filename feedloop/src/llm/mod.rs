mod api;
pub mod prompts;
mod provider;

pub use api::LlmApiClient;
pub use provider::{Completion, LlmBackend, LlmProvider, SIMULATED_RESPONSE};
