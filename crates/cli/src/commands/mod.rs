//! Command handlers for the docchat CLI.

pub mod ask;
pub mod chat;
mod common;
pub mod knowledge;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use knowledge::KnowledgeCommand;
