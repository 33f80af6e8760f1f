//! Ledger domain errors

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{AccountId, ClosureId, PortError, TransactionId};
use crate::cash_count::Denomination;
use crate::transaction::Transaction;

/// A missing or malformed input field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No account was given for a transaction or transfer leg
    #[error("An account is required")]
    MissingAccount,

    /// The amount is missing, zero, or has the wrong sign for the operation
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transfer-type transactions can only be created through a transfer
    #[error("Payment type 'transfer' is reserved for transfers")]
    ReservedPaymentType,

    /// Source and destination of a transfer are the same account
    #[error("Cannot transfer from account {0} to itself")]
    SameAccountTransfer(AccountId),

    /// No owner was given for a new closure
    #[error("A closure must belong to a user")]
    MissingUser,

    /// A new closure needs at least one account
    #[error("A closure needs at least one account")]
    NoAccounts,

    /// The same account appears twice in the opening balances
    #[error("Duplicate account in opening balances: {0}")]
    DuplicateAccount(AccountId),

    /// An opening balance was left empty
    #[error("Initial balance is required for account {0}")]
    MissingInitialBalance(AccountId),

    /// An opening balance is not a number
    #[error("Initial balance for account {account_id} is not a number: {value}")]
    NonNumericInitialBalance { account_id: AccountId, value: String },

    /// An opening balance is below zero
    #[error("Initial balance for account {account_id} cannot be negative: {value}")]
    NegativeInitialBalance { account_id: AccountId, value: Decimal },

    /// The closure date lies after the current business day
    #[error("Closure date {date} is after today ({today})")]
    DateInFuture { date: NaiveDate, today: NaiveDate },

    /// The closure date is not after the most recent closure
    #[error("Closure date {date} must be after the latest closure ({latest})")]
    DateNotAfterLatest { date: NaiveDate, latest: NaiveDate },

    /// A drawer count names a bill or coin the drawer does not hold
    #[error("Unknown denomination: {0}")]
    UnknownDenomination(Denomination),

    /// A drawer count quantity is negative or out of range
    #[error("Invalid quantity {quantity} for {denomination}")]
    InvalidQuantity { denomination: Denomination, quantity: i64 },

    /// The concept registry definition is unusable
    #[error("Invalid concept registry: {0}")]
    InvalidRegistry(String),
}

/// Errors that can occur in the ledger domain
///
/// All variants are recoverable; the caller decides how to present them.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input validation failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The concept is empty or not in the registry
    #[error("Concept not found: '{0}'")]
    ConceptNotFound(String),

    /// The operation would drive an account below zero
    #[error("Insufficient balance in account {account_id}: current balance {current}, required {required}")]
    InsufficientBalance {
        account_id: AccountId,
        current: Decimal,
        required: Decimal,
    },

    /// The transaction cannot move to another state
    #[error("Transaction {transaction_id} cannot be advanced: {reason}")]
    StateNotAdvanceable {
        transaction_id: TransactionId,
        reason: String,
    },

    /// A closure already exists for the date
    #[error("A closure already exists for {0}")]
    DuplicateClosureDate(NaiveDate),

    /// The user already has an open closure
    #[error("Closure {0} is still open; finalize it before creating a new one")]
    OpenClosureExists(ClosureId),

    /// A mutation was attempted on a closed closure
    #[error("Closure {0} is not open")]
    ClosureNotOpen(ClosureId),

    /// Finalization is blocked by transactions still in their workflow
    #[error("{} transaction(s) are still pending", .0.len())]
    PendingTransactionsExist(Vec<Transaction>),

    /// Account not found in the closure
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Transaction not found in the closure
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Closure not found in storage
    #[error("Closure not found: {0}")]
    ClosureNotFound(ClosureId),

    /// The persistence collaborator failed
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

impl LedgerError {
    /// Returns the blocking transactions of a rejected finalization
    pub fn pending_transactions(&self) -> Option<&[Transaction]> {
        match self {
            LedgerError::PendingTransactionsExist(pending) => Some(pending),
            _ => None,
        }
    }
}
