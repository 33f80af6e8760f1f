//! Transaction lifecycle manager
//!
//! Creates, advances, edits and deletes transactions within an open closure.
//! Every operation validates completely before touching the closure, so a
//! rejected call leaves accounts, transactions and final balance unchanged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use core_kernel::{Clock, TransactionId};
use crate::account::Account;
use crate::balance;
use crate::closure::Closure;
use crate::concept::ConceptRegistry;
use crate::error::{LedgerError, ValidationError};
use crate::transaction::{PaymentType, ProposedTransaction, Transaction};

/// Result of creating a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    pub updated_accounts: Vec<Account>,
    pub final_balance: Decimal,
}

/// Result of deleting a transaction (and its transfer partner, if any)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionOutcome {
    pub removed: Vec<Transaction>,
    pub updated_accounts: Vec<Account>,
    pub updated_transactions: Vec<Transaction>,
    pub final_balance: Decimal,
}

/// Manages individual transactions of a closure
pub struct TransactionManager<'a> {
    registry: &'a ConceptRegistry,
    clock: &'a dyn Clock,
}

impl<'a> TransactionManager<'a> {
    pub fn new(registry: &'a ConceptRegistry, clock: &'a dyn Clock) -> Self {
        Self { registry, clock }
    }

    /// Records a new income or expense transaction
    ///
    /// The amount's sign is normalized to the concept's polarity instead of
    /// being rejected: entering `500` for an expense concept records `-500`.
    /// Callers that need strict sign checking must validate before calling.
    ///
    /// # Errors
    ///
    /// Checked in order:
    /// - `ConceptNotFound` if the concept is empty or unknown
    /// - `Validation(MissingAccount)` if no account is given
    /// - `Validation(InvalidAmount)` if the amount is missing or zero
    /// - `Validation(ReservedPaymentType)` for payment type `transfer`
    /// - `AccountNotFound` if the account is not in the closure
    /// - `InsufficientBalance` if an expense would overdraw the account
    ///
    /// A closed closure fails with `ClosureNotOpen` before any of these.
    pub fn create(&self, closure: &mut Closure, proposed: ProposedTransaction) -> Result<CreatedTransaction, LedgerError> {
        closure.ensure_open()?;

        let concept = self.registry.resolve(&proposed.concept)?;

        if proposed.account_id.is_blank() {
            return Err(ValidationError::MissingAccount.into());
        }

        let amount = match proposed.amount {
            Some(amount) if !amount.is_zero() => amount,
            Some(_) => return Err(ValidationError::InvalidAmount("amount cannot be zero".to_string()).into()),
            None => return Err(ValidationError::InvalidAmount("amount is required".to_string()).into()),
        };

        if proposed.payment_type == PaymentType::Transfer {
            return Err(ValidationError::ReservedPaymentType.into());
        }

        let polarity = concept.polarity();
        let amount = if polarity.matches(amount) {
            amount
        } else {
            let corrected = polarity.normalize(amount);
            debug!(concept = %concept.name(), entered = %amount, %corrected, "Amount sign normalized to concept polarity");
            corrected
        };

        let account = closure
            .account(&proposed.account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(proposed.account_id.clone()))?;

        if amount < Decimal::ZERO {
            balance::ensure_sufficient(account, amount)?;
        }

        let transaction = Transaction {
            id: TransactionId::new(),
            concept: concept.name().to_string(),
            description: proposed.description,
            amount,
            status: concept.initial_state().name.clone(),
            account_id: proposed.account_id,
            timestamp: self.clock.now(),
            transfer_id: None,
            related_account_id: None,
            payment_type: proposed.payment_type,
        };

        balance::apply_amount(&mut closure.accounts, &transaction.account_id, amount)?;
        closure.transactions.push(transaction.clone());
        closure.recompute_final_balance();
        closure.updated_at = transaction.timestamp;

        info!(
            closure_id = %closure.id,
            transaction_id = %transaction.id,
            account_id = %transaction.account_id,
            %amount,
            "Transaction created"
        );

        Ok(CreatedTransaction {
            transaction,
            updated_accounts: closure.accounts.clone(),
            final_balance: closure.final_balance,
        })
    }

    /// Moves a transaction one step forward in its concept's workflow
    ///
    /// Balances are not touched.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the id is not in the closure
    /// - `StateNotAdvanceable` for transfer legs, unknown states and final states
    /// - `ConceptNotFound` if the transaction's concept is no longer registered
    pub fn advance_state(&self, closure: &mut Closure, transaction_id: &TransactionId) -> Result<Transaction, LedgerError> {
        closure.ensure_open()?;

        let transaction = closure
            .transaction(transaction_id)
            .ok_or(LedgerError::TransactionNotFound(*transaction_id))?;

        if transaction.is_transfer() {
            return Err(LedgerError::StateNotAdvanceable {
                transaction_id: *transaction_id,
                reason: "transfers have no workflow".to_string(),
            });
        }

        let concept = self.registry.resolve(&transaction.concept)?;
        let current = concept.state(&transaction.status).ok_or_else(|| LedgerError::StateNotAdvanceable {
            transaction_id: *transaction_id,
            reason: format!("state '{}' is not defined for '{}'", transaction.status, concept.name()),
        })?;

        let next = concept.next_state(&current.name).ok_or_else(|| LedgerError::StateNotAdvanceable {
            transaction_id: *transaction_id,
            reason: format!("'{}' is the final state", current.name),
        })?;
        let next_name = next.name.clone();

        let now = self.clock.now();
        let transaction = closure
            .transactions
            .iter_mut()
            .find(|t| &t.id == transaction_id)
            .ok_or(LedgerError::TransactionNotFound(*transaction_id))?;
        let previous = std::mem::replace(&mut transaction.status, next_name);
        let updated = transaction.clone();
        closure.updated_at = now;

        info!(
            closure_id = %closure.id,
            transaction_id = %transaction_id,
            from = %previous,
            to = %updated.status,
            "Transaction advanced"
        );

        Ok(updated)
    }

    /// Replaces a transaction's description
    pub fn update_description(
        &self,
        closure: &mut Closure,
        transaction_id: &TransactionId,
        description: impl Into<String>,
    ) -> Result<Transaction, LedgerError> {
        closure.ensure_open()?;

        let now = self.clock.now();
        let transaction = closure
            .transactions
            .iter_mut()
            .find(|t| &t.id == transaction_id)
            .ok_or(LedgerError::TransactionNotFound(*transaction_id))?;
        transaction.description = description.into();
        let updated = transaction.clone();
        closure.updated_at = now;

        debug!(closure_id = %closure.id, transaction_id = %transaction_id, "Description updated");

        Ok(updated)
    }

    /// Deletes a transaction and reverses its balance effect
    ///
    /// Deleting either leg of a transfer removes both legs.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if the id is not in the closure
    /// - `AccountNotFound` if a removed transaction's account is gone
    pub fn delete(&self, closure: &mut Closure, transaction_id: &TransactionId) -> Result<DeletionOutcome, LedgerError> {
        closure.ensure_open()?;

        let target = closure
            .transaction(transaction_id)
            .ok_or(LedgerError::TransactionNotFound(*transaction_id))?;

        let removed: Vec<Transaction> = match target.transfer_id {
            Some(transfer_id) => closure
                .transactions
                .iter()
                .filter(|t| t.transfer_id == Some(transfer_id))
                .cloned()
                .collect(),
            None => vec![target.clone()],
        };

        let mut accounts = closure.accounts.clone();
        for transaction in &removed {
            balance::apply_amount(&mut accounts, &transaction.account_id, -transaction.amount)?;
        }

        for account in accounts.iter().filter(|a| a.current_balance < Decimal::ZERO) {
            warn!(
                closure_id = %closure.id,
                account_id = %account.id,
                balance = %account.current_balance,
                "Deletion leaves account with a negative balance"
            );
        }

        closure.accounts = accounts;
        closure
            .transactions
            .retain(|t| !removed.iter().any(|r| r.id == t.id));
        closure.recompute_final_balance();
        closure.updated_at = self.clock.now();

        info!(
            closure_id = %closure.id,
            transaction_id = %transaction_id,
            removed = removed.len(),
            "Transaction deleted"
        );

        Ok(DeletionOutcome {
            removed,
            updated_accounts: closure.accounts.clone(),
            updated_transactions: closure.transactions.clone(),
            final_balance: closure.final_balance,
        })
    }
}
