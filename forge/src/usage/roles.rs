//! Account roles and their usage allowances

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::errors::ForgeError;

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Free,
    Premium,
    Admin,
}

impl Role {
    /// Starting token balance, `None` for unmetered roles
    pub fn starting_balance(&self, limits: &RoleLimits) -> Option<u64> {
        match self {
            Role::Free => Some(limits.free),
            Role::Premium => Some(limits.premium),
            Role::Admin => None,
        }
    }
}

/// Starting balances per role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLimits {
    #[serde(default = "default_free_limit")]
    pub free: u64,
    #[serde(default = "default_premium_limit")]
    pub premium: u64,
}

fn default_free_limit() -> u64 {
    5_000
}

fn default_premium_limit() -> u64 {
    50_000
}

impl Default for RoleLimits {
    fn default() -> Self {
        Self {
            free: default_free_limit(),
            premium: default_premium_limit(),
        }
    }
}

/// Role lookup
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn role_of(&self, account_id: &str) -> Result<Role, ForgeError>;
}

/// In-memory role directory with a default for unknown accounts
#[derive(Default)]
pub struct StaticRoleDirectory {
    roles: RwLock<HashMap<String, Role>>,
    default_role: Role,
}

impl StaticRoleDirectory {
    pub fn new(default_role: Role) -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
            default_role,
        }
    }

    pub async fn assign(&self, account_id: &str, role: Role) {
        self.roles.write().await.insert(account_id.to_string(), role);
    }
}

#[async_trait]
impl RoleDirectory for StaticRoleDirectory {
    async fn role_of(&self, account_id: &str) -> Result<Role, ForgeError> {
        Ok(self
            .roles
            .read()
            .await
            .get(account_id)
            .copied()
            .unwrap_or(self.default_role))
    }
}
