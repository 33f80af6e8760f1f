//! Accounts held by a closure
//!
//! Each closure snapshots its own list of accounts. The chart of accounts
//! (`AccountSpec`) is configuration; `Account` adds the balances of one day.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::AccountId;

/// Types of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Cash drawers and boxes
    Cash,
    /// Debit bank accounts
    Bank,
    /// Credit lines, tracked with non-negative balances like any other account
    Credit,
}

/// An entry in the chart of accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSpec {
    /// Unique identifier
    pub id: AccountId,
    /// Display name
    pub name: String,
    /// Account type
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

impl AccountSpec {
    pub fn new(id: impl Into<AccountId>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            account_type,
        }
    }
}

/// An account as held by one closure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Display name
    pub name: String,
    /// Account type
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Balance at the opening of the closure; never changes afterwards
    pub initial_balance: Decimal,
    /// Balance after every transaction recorded so far
    pub current_balance: Decimal,
}

impl Account {
    /// Creates an account whose current balance equals its opening balance
    ///
    /// # Arguments
    ///
    /// * `spec` - Chart entry for the account
    /// * `initial_balance` - Opening balance
    pub fn open(spec: AccountSpec, initial_balance: Decimal) -> Self {
        Self {
            id: spec.id,
            name: spec.name,
            account_type: spec.account_type,
            initial_balance,
            current_balance: initial_balance,
        }
    }

    /// Returns the chart entry this account was opened from
    pub fn spec(&self) -> AccountSpec {
        AccountSpec {
            id: self.id.clone(),
            name: self.name.clone(),
            account_type: self.account_type,
        }
    }
}

/// Default chart of accounts for a single shop
pub struct StandardChart;

impl StandardChart {
    /// Two cash boxes, a debit bank account and a credit bank account
    pub fn accounts() -> Vec<AccountSpec> {
        vec![
            AccountSpec::new("account-1", "Vault box", AccountType::Cash),
            AccountSpec::new("account-2", "Counter box", AccountType::Cash),
            AccountSpec::new("account-3", "Debit bank account", AccountType::Bank),
            AccountSpec::new("account-4", "Credit bank account", AccountType::Credit),
        ]
    }
}
