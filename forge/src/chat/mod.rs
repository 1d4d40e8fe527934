//! Bot code generation through a chat-completion endpoint

pub mod client;
pub mod cost;
pub mod extract;
pub mod models;
pub mod prompt;
