pub mod cors;
pub mod envelope;
pub mod handlers;
pub mod serve;
pub mod state;
