mod chat;
mod common;
mod document;
mod feedback;

pub use chat::*;
pub use common::*;
pub use document::*;
pub use feedback::*;
