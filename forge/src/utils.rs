//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Version information for the relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Backoff options
#[derive(Debug, Clone, Copy)]
pub struct BackoffOptions {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// `min(base * 2^exponent, max)`
pub fn calc_exp_backoff(options: &BackoffOptions, exponent: u32) -> Duration {
    let factor = 2u32.saturating_pow(exponent);
    options
        .base_delay
        .saturating_mul(factor)
        .min(options.max_delay)
}

/// `base * attempt`, uncapped
pub fn calc_linear_backoff(options: &BackoffOptions, attempt: u32) -> Duration {
    options.base_delay.saturating_mul(attempt)
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
