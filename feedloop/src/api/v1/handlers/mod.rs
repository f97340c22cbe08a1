pub mod chat;
pub mod documents;
pub mod feedback;
pub(crate) mod health;

pub use health::health_check;
