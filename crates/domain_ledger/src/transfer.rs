//! Transfer manager
//!
//! Moves money between two accounts of the same closure as a pair of linked
//! transactions. The legs share a transfer id and a timestamp, carry opposite
//! amounts, and are created and deleted together.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{AccountId, Clock, TransactionId, TransferId};
use crate::account::Account;
use crate::balance;
use crate::closure::Closure;
use crate::concept::ConceptRegistry;
use crate::error::{LedgerError, ValidationError};
use crate::transaction::{PaymentType, Transaction};

/// Concept label prefix shared by both legs of a transfer
pub const TRANSFER_CONCEPT_PREFIX: &str = "Transfer #";

/// Caller input for a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
}

impl TransferRequest {
    pub fn new(from: impl Into<AccountId>, to: impl Into<AccountId>, amount: Decimal) -> Self {
        Self {
            from_account_id: from.into(),
            to_account_id: to.into(),
            amount,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Result of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub updated_accounts: Vec<Account>,
    pub updated_transactions: Vec<Transaction>,
    pub final_balance: Decimal,
    pub debit_transaction: Transaction,
    pub credit_transaction: Transaction,
}

/// Number the next transfer in a closure should carry
///
/// One more than the highest `Transfer #N` label present, starting at 1.
pub fn next_transfer_number(transactions: &[Transaction]) -> u32 {
    transactions
        .iter()
        .filter_map(|t| t.concept.strip_prefix(TRANSFER_CONCEPT_PREFIX))
        .filter_map(|n| n.trim().parse::<u32>().ok())
        .max()
        .map_or(1, |n| n + 1)
}

/// Executes transfers within a closure
pub struct TransferManager<'a> {
    registry: &'a ConceptRegistry,
    clock: &'a dyn Clock,
}

impl<'a> TransferManager<'a> {
    pub fn new(registry: &'a ConceptRegistry, clock: &'a dyn Clock) -> Self {
        Self { registry, clock }
    }

    /// Moves `amount` from one account to another
    ///
    /// Either both legs are recorded or nothing changes.
    ///
    /// # Errors
    ///
    /// Checked in order:
    /// - `Validation(MissingAccount)` / `AccountNotFound` for the source
    /// - `Validation(MissingAccount)` / `AccountNotFound` for the destination
    /// - `Validation(InvalidAmount)` unless the amount is positive
    /// - `Validation(SameAccountTransfer)` if both accounts are the same
    /// - `InsufficientBalance` if the source holds less than the amount
    pub fn execute(&self, closure: &mut Closure, request: TransferRequest) -> Result<TransferOutcome, LedgerError> {
        closure.ensure_open()?;

        let from = self.resolve_account(closure, &request.from_account_id)?;
        self.resolve_account(closure, &request.to_account_id)?;

        if request.amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount("transfer amount must be greater than zero".to_string()).into());
        }

        if request.from_account_id == request.to_account_id {
            return Err(ValidationError::SameAccountTransfer(request.from_account_id).into());
        }

        let amount = request.amount.abs();
        balance::ensure_sufficient(from, -amount)?;

        let number = next_transfer_number(&closure.transactions);
        let concept = format!("{}{}", TRANSFER_CONCEPT_PREFIX, number);
        let transfer_id = TransferId::new();
        let timestamp = self.clock.now();
        let status = self.registry.completed_state().to_string();

        let debit = Transaction {
            id: TransactionId::new(),
            concept: concept.clone(),
            description: format!("{} (Debit)", request.description),
            amount: -amount,
            status: status.clone(),
            account_id: request.from_account_id.clone(),
            timestamp,
            transfer_id: Some(transfer_id),
            related_account_id: Some(request.to_account_id.clone()),
            payment_type: PaymentType::Transfer,
        };

        let credit = Transaction {
            id: TransactionId::new(),
            concept,
            description: format!("{} (Credit)", request.description),
            amount,
            status,
            account_id: request.to_account_id.clone(),
            timestamp,
            transfer_id: Some(transfer_id),
            related_account_id: Some(request.from_account_id.clone()),
            payment_type: PaymentType::Transfer,
        };

        let mut accounts = closure.accounts.clone();
        balance::apply_amount(&mut accounts, &debit.account_id, debit.amount)?;
        balance::apply_amount(&mut accounts, &credit.account_id, credit.amount)?;

        closure.accounts = accounts;
        closure.transactions.push(debit.clone());
        closure.transactions.push(credit.clone());
        closure.recompute_final_balance();
        closure.updated_at = timestamp;

        info!(
            closure_id = %closure.id,
            %transfer_id,
            from = %request.from_account_id,
            to = %request.to_account_id,
            %amount,
            "Transfer executed"
        );

        Ok(TransferOutcome {
            updated_accounts: closure.accounts.clone(),
            updated_transactions: closure.transactions.clone(),
            final_balance: closure.final_balance,
            debit_transaction: debit,
            credit_transaction: credit,
        })
    }

    fn resolve_account<'c>(&self, closure: &'c Closure, id: &AccountId) -> Result<&'c Account, LedgerError> {
        if id.is_blank() {
            return Err(ValidationError::MissingAccount.into());
        }
        closure
            .account(id)
            .ok_or_else(|| LedgerError::AccountNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn labelled(concept: &str) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            concept: concept.to_string(),
            description: String::new(),
            amount: Decimal::ONE,
            status: "Completed".to_string(),
            account_id: AccountId::new("a"),
            timestamp: Utc::now(),
            transfer_id: None,
            related_account_id: None,
            payment_type: PaymentType::Cash,
        }
    }

    #[test]
    fn test_next_transfer_number_starts_at_one() {
        assert_eq!(next_transfer_number(&[]), 1);
        assert_eq!(next_transfer_number(&[labelled("(-) Salaries")]), 1);
    }

    #[test]
    fn test_next_transfer_number_uses_max() {
        let txs = vec![labelled("Transfer #2"), labelled("Transfer #7"), labelled("Transfer #3")];
        assert_eq!(next_transfer_number(&txs), 8);
    }

    #[test]
    fn test_next_transfer_number_ignores_garbage() {
        let txs = vec![labelled("Transfer #x"), labelled("Transfer #1")];
        assert_eq!(next_transfer_number(&txs), 2);
    }
}
