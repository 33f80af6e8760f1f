//! Daily closure aggregate and its lifecycle
//!
//! A closure holds one business day of bookkeeping for one user. It is
//! opened with the previous day's ending balances, mutated while open, and
//! finalized once every transaction has completed its workflow. Finalization
//! cannot be undone.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::info;

use core_kernel::{AccountId, ClosureId, TransactionId, UserId};
use crate::account::{Account, AccountSpec};
use crate::balance;
use crate::concept::ConceptRegistry;
use crate::error::{LedgerError, ValidationError};
use crate::transaction::Transaction;

/// Closure status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosureStatus {
    Open,
    Closed,
}

impl ClosureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureStatus::Open => "open",
            ClosureStatus::Closed => "closed",
        }
    }
}

/// One business day of bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Closure {
    /// Unique identifier
    pub id: ClosureId,
    /// Business day
    pub date: NaiveDate,
    /// Status
    pub status: ClosureStatus,
    /// Snapshot of accounts with their balances
    pub accounts: Vec<Account>,
    /// Transactions in creation order
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Free-text notes
    #[serde(default)]
    pub observations: String,
    /// Owner
    pub user_id: UserId,
    /// Sum of all current balances
    pub final_balance: Decimal,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Closure {
    pub fn is_open(&self) -> bool {
        self.status == ClosureStatus::Open
    }

    /// Fails with `ClosureNotOpen` unless the closure is open
    pub fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(LedgerError::ClosureNotOpen(self.id))
        }
    }

    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| &a.id == id)
    }

    pub fn transaction(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|t| &t.id == id)
    }

    /// Sets `final_balance` from the accounts
    pub fn recompute_final_balance(&mut self) {
        self.final_balance = balance::final_balance(&self.accounts);
    }
}

/// Proposed opening balance for one account of a new closure
///
/// The balance is kept as entered so that empty and non-numeric input can be
/// reported precisely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningBalance {
    #[serde(flatten)]
    pub account: AccountSpec,
    pub initial_balance: Option<String>,
}

impl OpeningBalance {
    pub fn new(account: AccountSpec, initial_balance: impl Into<String>) -> Self {
        Self {
            account,
            initial_balance: Some(initial_balance.into()),
        }
    }

    /// An opening balance left for the user to fill in
    pub fn empty(account: AccountSpec) -> Self {
        Self {
            account,
            initial_balance: None,
        }
    }
}

/// Validates a user-entered opening balance
///
/// # Errors
///
/// - `MissingInitialBalance` if the value is absent or blank
/// - `NonNumericInitialBalance` if it is not a decimal number
/// - `NegativeInitialBalance` if it is below zero
pub fn parse_initial_balance(account_id: &AccountId, raw: Option<&str>) -> Result<Decimal, ValidationError> {
    let value = match raw.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Err(ValidationError::MissingInitialBalance(account_id.clone())),
    };

    let amount = Decimal::from_str(value).map_err(|_| ValidationError::NonNumericInitialBalance {
        account_id: account_id.clone(),
        value: value.to_string(),
    })?;

    if amount < Decimal::ZERO {
        return Err(ValidationError::NegativeInitialBalance {
            account_id: account_id.clone(),
            value: amount,
        });
    }

    Ok(amount)
}

/// The closure with the latest date
pub fn latest_closure(closures: &[Closure]) -> Option<&Closure> {
    closures.iter().max_by_key(|c| c.date)
}

/// Proposed opening balances for a new closure
///
/// Each account of the chart starts from its ending balance in `previous`,
/// rounded to cents. Accounts the previous closure does not hold are left
/// empty.
pub fn seed_opening_balances(chart: &[AccountSpec], previous: Option<&Closure>) -> Vec<OpeningBalance> {
    chart
        .iter()
        .map(|spec| {
            let carried = previous.and_then(|closure| closure.account(&spec.id));
            match carried {
                Some(account) => {
                    let rounded = account
                        .current_balance
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                    OpeningBalance::new(spec.clone(), format!("{:.2}", rounded))
                }
                None => OpeningBalance::empty(spec.clone()),
            }
        })
        .collect()
}

/// Replaces the closure's notes
///
/// # Errors
///
/// Returns `ClosureNotOpen` if the closure is closed
pub fn update_observations(closure: &mut Closure, observations: impl Into<String>, now: DateTime<Utc>) -> Result<(), LedgerError> {
    closure.ensure_open()?;
    closure.observations = observations.into();
    closure.updated_at = now;
    Ok(())
}

/// Opens and finalizes closures
pub struct ClosureLifecycle<'a> {
    registry: &'a ConceptRegistry,
}

impl<'a> ClosureLifecycle<'a> {
    pub fn new(registry: &'a ConceptRegistry) -> Self {
        Self { registry }
    }

    /// Opens a new closure
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner of the closure
    /// * `date` - Business day of the closure
    /// * `today` - Current business day
    /// * `existing` - The user's existing closures
    /// * `balances` - Proposed opening balances, one per account
    /// * `now` - Creation instant
    ///
    /// # Errors
    ///
    /// - `OpenClosureExists` if one of `existing` is still open
    /// - `Validation` if the date is after today or before the latest closure
    /// - `DuplicateClosureDate` if a closure already exists for the date
    /// - `Validation` if an opening balance is missing, non-numeric or negative
    pub fn open(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        today: NaiveDate,
        existing: &[Closure],
        balances: Vec<OpeningBalance>,
        now: DateTime<Utc>,
    ) -> Result<Closure, LedgerError> {
        if user_id.is_blank() {
            return Err(ValidationError::MissingUser.into());
        }

        if let Some(open) = existing.iter().find(|c| c.is_open()) {
            return Err(LedgerError::OpenClosureExists(open.id));
        }

        if date > today {
            return Err(ValidationError::DateInFuture { date, today }.into());
        }

        if existing.iter().any(|c| c.date == date) {
            return Err(LedgerError::DuplicateClosureDate(date));
        }

        if let Some(latest) = latest_closure(existing) {
            if date <= latest.date {
                return Err(ValidationError::DateNotAfterLatest {
                    date,
                    latest: latest.date,
                }
                .into());
            }
        }

        if balances.is_empty() {
            return Err(ValidationError::NoAccounts.into());
        }

        let mut seen = HashSet::new();
        let mut accounts = Vec::with_capacity(balances.len());
        for opening in balances {
            if opening.account.id.is_blank() {
                return Err(ValidationError::MissingAccount.into());
            }
            if !seen.insert(opening.account.id.clone()) {
                return Err(ValidationError::DuplicateAccount(opening.account.id).into());
            }
            let initial = parse_initial_balance(&opening.account.id, opening.initial_balance.as_deref())?;
            accounts.push(Account::open(opening.account, initial));
        }

        let final_balance = balance::final_balance(&accounts);
        let closure = Closure {
            id: ClosureId::new(),
            date,
            status: ClosureStatus::Open,
            accounts,
            transactions: Vec::new(),
            observations: String::new(),
            user_id: user_id.clone(),
            final_balance,
            created_at: now,
            updated_at: now,
        };

        info!(closure_id = %closure.id, user_id = %user_id, %date, %final_balance, "Closure opened");

        Ok(closure)
    }

    /// Closes a closure
    ///
    /// # Errors
    ///
    /// - `ClosureNotOpen` if it is already closed
    /// - `PendingTransactionsExist` listing every non-transfer transaction not
    ///   in its concept's final state
    pub fn finalize(&self, closure: &mut Closure, now: DateTime<Utc>) -> Result<(), LedgerError> {
        closure.ensure_open()?;

        let pending = self.registry.pending_transactions(&closure.transactions);
        if !pending.is_empty() {
            return Err(LedgerError::PendingTransactionsExist(pending));
        }

        closure.status = ClosureStatus::Closed;
        closure.updated_at = now;

        info!(closure_id = %closure.id, final_balance = %closure.final_balance, "Closure finalized");

        Ok(())
    }

    /// Checks that a closure may be deleted
    ///
    /// # Errors
    ///
    /// Returns `ClosureNotOpen` for a closed closure
    pub fn ensure_deletable(&self, closure: &Closure) -> Result<(), LedgerError> {
        closure.ensure_open()
    }
}
