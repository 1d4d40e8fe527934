//! Usage metering: roles and token balances

pub mod ledger;
pub mod roles;
