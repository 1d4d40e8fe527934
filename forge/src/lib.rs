//! botforge Library
//!
//! Core modules for generating Discord bots and deploying them to a hosting panel.

pub mod app;
pub mod chat;
pub mod context;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod panel;
pub mod redact;
pub mod server;
pub mod storage;
pub mod usage;
pub mod utils;
pub mod workflow;
