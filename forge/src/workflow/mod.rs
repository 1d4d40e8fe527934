//! Deployment workflow

pub mod bundle;
pub mod deploy;
