//! Outbound HTTP: client, raw responses and the retry client

pub mod client;
pub mod response;
pub mod retry;
