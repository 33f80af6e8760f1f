//! Port interfaces for the ledger domain
//!
//! The ledger core depends only on these traits; persistence and the
//! invoicing system are supplied as adapters.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClosureId, DomainPort, PortError, UserId};
use crate::account::Account;
use crate::closure::{Closure, ClosureStatus};
use crate::reconciliation::ExternalPayment;
use crate::transaction::Transaction;

/// Partial update of a closure, written in one operation
///
/// Fields left as `None` are not touched. `updated_at` is always written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<Account>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClosureStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ClosureFields {
    /// Only the timestamp
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            accounts: None,
            transactions: None,
            final_balance: None,
            status: None,
            observations: None,
            updated_at,
        }
    }

    /// Accounts, transactions and final balance of the closure
    pub fn ledger(closure: &Closure) -> Self {
        Self {
            accounts: Some(closure.accounts.clone()),
            transactions: Some(closure.transactions.clone()),
            final_balance: Some(closure.final_balance),
            ..Self::touch(closure.updated_at)
        }
    }

    /// Transactions only
    pub fn transactions(closure: &Closure) -> Self {
        Self {
            transactions: Some(closure.transactions.clone()),
            ..Self::touch(closure.updated_at)
        }
    }

    /// Status only
    pub fn status(closure: &Closure) -> Self {
        Self {
            status: Some(closure.status),
            ..Self::touch(closure.updated_at)
        }
    }

    /// Observations only
    pub fn observations(closure: &Closure) -> Self {
        Self {
            observations: Some(closure.observations.clone()),
            ..Self::touch(closure.updated_at)
        }
    }

    /// Applies the update to an in-memory closure
    pub fn apply_to(self, closure: &mut Closure) {
        if let Some(accounts) = self.accounts {
            closure.accounts = accounts;
        }
        if let Some(transactions) = self.transactions {
            closure.transactions = transactions;
        }
        if let Some(final_balance) = self.final_balance {
            closure.final_balance = final_balance;
        }
        if let Some(status) = self.status {
            closure.status = status;
        }
        if let Some(observations) = self.observations {
            closure.observations = observations;
        }
        closure.updated_at = self.updated_at;
    }
}

/// Persistence of closures
#[async_trait]
pub trait ClosureStore: DomainPort {
    /// Reads a closure by id
    ///
    /// # Errors
    ///
    /// Returns `PortError::NotFound` if it does not exist
    async fn read_closure(&self, id: &ClosureId) -> Result<Closure, PortError>;

    /// Stores a new closure
    async fn create_closure(&self, closure: &Closure) -> Result<(), PortError>;

    /// Writes a subset of fields in one operation
    async fn write_closure_fields(&self, id: &ClosureId, fields: ClosureFields) -> Result<(), PortError>;

    /// Removes a closure
    async fn delete_closure(&self, id: &ClosureId) -> Result<(), PortError>;

    /// All closures of a user, oldest first
    async fn list_closures_for_user(&self, user_id: &UserId) -> Result<Vec<Closure>, PortError>;
}

/// Payments known to the external invoicing system
#[async_trait]
pub trait PaymentSource: DomainPort {
    /// Payments recorded for a business day
    async fn fetch_external_payments_for_date(&self, date: NaiveDate) -> Result<Vec<ExternalPayment>, PortError>;
}
