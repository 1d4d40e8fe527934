//! Token balance metering
//!
//! Balances live in a [`BalanceStore`]; debits are a compare-and-swap loop
//! against a per-account version so concurrent completions for the same
//! account never lose an update.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::ForgeError;
use crate::usage::roles::{RoleDirectory, RoleLimits};

/// CAS attempts before a debit gives up
const MAX_CAS_ATTEMPTS: u32 = 8;

/// Stored balance with its version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceRecord {
    pub tokens: u64,
    pub version: u64,
}

/// Persistent balance storage
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn load(&self, account_id: &str) -> Result<Option<BalanceRecord>, ForgeError>;

    /// Write `tokens` if the stored version still equals `expected_version`
    ///
    /// `None` means "only if no record exists yet". Returns whether the write happened.
    async fn compare_and_swap(
        &self,
        account_id: &str,
        expected_version: Option<u64>,
        tokens: u64,
    ) -> Result<bool, ForgeError>;
}

/// Balance store held in memory
#[derive(Default)]
pub struct InMemoryBalanceStore {
    records: RwLock<HashMap<String, BalanceRecord>>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn load(&self, account_id: &str) -> Result<Option<BalanceRecord>, ForgeError> {
        Ok(self.records.read().await.get(account_id).copied())
    }

    async fn compare_and_swap(
        &self,
        account_id: &str,
        expected_version: Option<u64>,
        tokens: u64,
    ) -> Result<bool, ForgeError> {
        let mut records = self.records.write().await;
        let current = records.get(account_id).map(|r| r.version);
        if current != expected_version {
            return Ok(false);
        }
        let version = current.map_or(0, |v| v + 1);
        records.insert(account_id.to_string(), BalanceRecord { tokens, version });
        Ok(true)
    }
}

/// Remaining allowance of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "tokens")]
pub enum Balance {
    Metered(u64),
    Unmetered,
}

impl Balance {
    pub fn remaining(&self) -> Option<u64> {
        match self {
            Balance::Metered(tokens) => Some(*tokens),
            Balance::Unmetered => None,
        }
    }
}

/// Per-account usage ledger
pub struct UsageLedger {
    store: Arc<dyn BalanceStore>,
    roles: Arc<dyn RoleDirectory>,
    limits: RoleLimits,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn BalanceStore>, roles: Arc<dyn RoleDirectory>, limits: RoleLimits) -> Self {
        Self { store, roles, limits }
    }

    /// Current balance; first use seeds it from the account's role
    pub async fn balance(&self, account_id: &str) -> Result<Balance, ForgeError> {
        Ok(match self.record(account_id).await? {
            Some(record) => Balance::Metered(record.tokens),
            None => Balance::Unmetered,
        })
    }

    /// Fail with `QuotaExceeded` when a metered account has nothing left
    pub async fn ensure_available(&self, account_id: &str) -> Result<Balance, ForgeError> {
        let balance = self.balance(account_id).await?;
        if balance == Balance::Metered(0) {
            return Err(ForgeError::QuotaExceeded {
                balance: 0,
                cost: 1,
            });
        }
        Ok(balance)
    }

    /// Subtract `cost`, never going below zero
    pub async fn debit(&self, account_id: &str, cost: u64) -> Result<Balance, ForgeError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(record) = self.record(account_id).await? else {
                return Ok(Balance::Unmetered);
            };
            let tokens = record.tokens.saturating_sub(cost);
            if self
                .store
                .compare_and_swap(account_id, Some(record.version), tokens)
                .await?
            {
                debug!(
                    "Debited {} tokens from {} ({} left)",
                    cost, account_id, tokens
                );
                return Ok(Balance::Metered(tokens));
            }
            warn!(
                "Concurrent balance update for {}, retrying debit (attempt {})",
                account_id, attempt
            );
        }
        Err(ForgeError::Internal(format!(
            "balance for {} is under heavy contention",
            account_id
        )))
    }

    /// Stored record, seeding it on first use; `None` for unmetered accounts
    async fn record(&self, account_id: &str) -> Result<Option<BalanceRecord>, ForgeError> {
        if account_id.trim().is_empty() {
            return Err(ForgeError::Validation("account id is required".to_string()));
        }
        let role = self.roles.role_of(account_id).await?;
        let Some(starting) = role.starting_balance(&self.limits) else {
            return Ok(None);
        };

        if let Some(record) = self.store.load(account_id).await? {
            return Ok(Some(record));
        }
        // Losing the seeding race is fine: the winner's record is read back
        self.store.compare_and_swap(account_id, None, starting).await?;
        self.store.load(account_id).await
    }
}
