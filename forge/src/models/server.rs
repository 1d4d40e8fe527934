//! Hosting server models

use serde::{Deserialize, Serialize};

/// A user's request to deploy a bot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub desired_name: String,
    pub description: String,
    pub owner_account_id: String,
}

/// Remote server lifecycle as observed by the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Installing,
    Running,
    Suspended,
    Error,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Installing => "installing",
            ServerStatus::Running => "running",
            ServerStatus::Suspended => "suspended",
            ServerStatus::Error => "error",
        }
    }
}

/// A server created on the hosting panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedServer {
    /// Panel identifier, carried verbatim
    pub id: String,
    pub name: String,
    pub owner_account_id: String,
    pub status: ServerStatus,
}

/// An account created on the hosting panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostingAccount {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Outcome of a successful installation wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationReport {
    pub server_id: String,
    pub polls: u32,
    pub elapsed_ms: u64,
}
