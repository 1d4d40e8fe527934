//! Domain models

pub mod server;
pub mod upload;
