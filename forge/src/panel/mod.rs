//! Hosting panel orchestration: provisioning, installation polling and file deployment

pub mod api;
pub mod classify;
pub mod files;
pub mod installer;
pub mod provisioner;
