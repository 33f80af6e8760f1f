//! Balance engine
//!
//! Pure functions deriving and validating balances. Nothing here mutates a
//! closure except `apply_amount`, which the managers call once all validation
//! has passed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use core_kernel::{AccountId, TransactionId};
use crate::account::{Account, AccountType};
use crate::closure::Closure;
use crate::error::LedgerError;
use crate::transaction::Transaction;

/// Current balances summed by account type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTotals {
    pub cash_total: Decimal,
    pub bank_total: Decimal,
    pub credit_total: Decimal,
}

impl AccountTotals {
    /// Sum across all types
    pub fn total(&self) -> Decimal {
        self.cash_total + self.bank_total + self.credit_total
    }
}

/// One line of an account's running balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningBalanceEntry {
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    pub balance: Decimal,
}

/// Running balances of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLedger {
    pub account_id: AccountId,
    pub initial_balance: Decimal,
    pub entries: Vec<RunningBalanceEntry>,
}

/// A disagreement between stored and derived balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BalanceDiscrepancy {
    /// `currentBalance` differs from `initialBalance + sum(amounts)`
    #[serde(rename_all = "camelCase")]
    Account {
        account_id: AccountId,
        expected: Decimal,
        actual: Decimal,
    },
    /// `finalBalance` differs from the sum of current balances
    #[serde(rename_all = "camelCase")]
    FinalBalance { expected: Decimal, actual: Decimal },
    /// A transaction points at an account the closure does not hold
    #[serde(rename_all = "camelCase")]
    UnknownAccount {
        transaction_id: TransactionId,
        account_id: AccountId,
    },
}

/// Post-transaction balances of one account
///
/// Starts from the account's initial balance and adds each amount in the
/// order given. The caller passes the account's transactions ordered by time;
/// one balance is produced per transaction.
pub fn running_balance<'a, I>(account: &Account, transactions: I) -> Vec<Decimal>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut balance = account.initial_balance;
    transactions
        .into_iter()
        .map(|t| {
            balance += t.amount;
            balance
        })
        .collect()
}

/// Running balances for every account of a closure
///
/// Transactions are grouped by account, keeping the order in which they are
/// given. Accounts are returned in their closure order.
pub fn running_balances(accounts: &[Account], transactions: &[Transaction]) -> Vec<AccountLedger> {
    let mut by_account: HashMap<&AccountId, Vec<&Transaction>> = HashMap::new();
    for transaction in transactions {
        by_account.entry(&transaction.account_id).or_default().push(transaction);
    }

    accounts
        .iter()
        .map(|account| {
            let own = by_account.remove(&account.id).unwrap_or_default();
            let balances = running_balance(account, own.iter().copied());
            let entries = own
                .iter()
                .zip(balances)
                .map(|(t, balance)| RunningBalanceEntry {
                    transaction_id: t.id,
                    amount: t.amount,
                    balance,
                })
                .collect();

            AccountLedger {
                account_id: account.id.clone(),
                initial_balance: account.initial_balance,
                entries,
            }
        })
        .collect()
}

/// Sums current balances by account type
pub fn account_totals(accounts: &[Account]) -> AccountTotals {
    accounts.iter().fold(AccountTotals::default(), |mut totals, account| {
        match account.account_type {
            AccountType::Cash => totals.cash_total += account.current_balance,
            AccountType::Bank => totals.bank_total += account.current_balance,
            AccountType::Credit => totals.credit_total += account.current_balance,
        }
        totals
    })
}

/// Sum of all current balances
pub fn final_balance(accounts: &[Account]) -> Decimal {
    accounts.iter().map(|a| a.current_balance).sum()
}

/// Returns true if adding `proposed_amount` would leave the account below zero
///
/// Applies to every account type, credit included.
pub fn would_go_negative(account: &Account, proposed_amount: Decimal) -> bool {
    account.current_balance + proposed_amount < Decimal::ZERO
}

/// Movement of the account since the closure opened
pub fn balance_difference(account: &Account) -> Decimal {
    account.current_balance - account.initial_balance
}

/// The balance an account should have given its transactions
pub fn expected_balance(account: &Account, transactions: &[Transaction]) -> Decimal {
    account.initial_balance
        + transactions
            .iter()
            .filter(|t| t.account_id == account.id)
            .map(|t| t.amount)
            .sum::<Decimal>()
}

/// Audits a closure's stored balances against its transactions
///
/// Returns an empty list when every account and the final balance agree.
pub fn verify_consistency(closure: &Closure) -> Vec<BalanceDiscrepancy> {
    let mut discrepancies = Vec::new();

    for account in &closure.accounts {
        let expected = expected_balance(account, &closure.transactions);
        if expected != account.current_balance {
            discrepancies.push(BalanceDiscrepancy::Account {
                account_id: account.id.clone(),
                expected,
                actual: account.current_balance,
            });
        }
    }

    for transaction in &closure.transactions {
        if closure.account(&transaction.account_id).is_none() {
            discrepancies.push(BalanceDiscrepancy::UnknownAccount {
                transaction_id: transaction.id,
                account_id: transaction.account_id.clone(),
            });
        }
    }

    let expected = final_balance(&closure.accounts);
    if expected != closure.final_balance {
        discrepancies.push(BalanceDiscrepancy::FinalBalance {
            expected,
            actual: closure.final_balance,
        });
    }

    discrepancies
}

/// Fails with `InsufficientBalance` if the amount would overdraw the account
pub(crate) fn ensure_sufficient(account: &Account, amount: Decimal) -> Result<(), LedgerError> {
    if would_go_negative(account, amount) {
        return Err(LedgerError::InsufficientBalance {
            account_id: account.id.clone(),
            current: account.current_balance,
            required: amount.abs(),
        });
    }
    Ok(())
}

/// Adds a signed amount to an account's current balance
pub(crate) fn apply_amount(
    accounts: &mut [Account],
    account_id: &AccountId,
    amount: Decimal,
) -> Result<(), LedgerError> {
    let account = accounts
        .iter_mut()
        .find(|a| &a.id == account_id)
        .ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;
    account.current_balance += amount;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountSpec;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::transaction::PaymentType;

    fn account(id: &str, account_type: AccountType, balance: Decimal) -> Account {
        Account::open(AccountSpec::new(id, id, account_type), balance)
    }

    fn tx(account_id: &str, amount: Decimal) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            concept: "(+) Sales income".to_string(),
            description: String::new(),
            amount,
            status: "Completed".to_string(),
            account_id: AccountId::new(account_id),
            timestamp: Utc::now(),
            transfer_id: None,
            related_account_id: None,
            payment_type: PaymentType::Cash,
        }
    }

    #[test]
    fn test_running_balance_one_value_per_transaction() {
        let cash = account("cash", AccountType::Cash, dec!(100));
        let txs = vec![tx("cash", dec!(50)), tx("cash", dec!(-30)), tx("cash", dec!(10))];
        assert_eq!(running_balance(&cash, &txs), vec![dec!(150), dec!(120), dec!(130)]);
    }

    #[test]
    fn test_running_balance_empty() {
        let cash = account("cash", AccountType::Cash, dec!(100));
        assert!(running_balance(&cash, &[]).is_empty());
    }

    #[test]
    fn test_running_balances_groups_by_account() {
        let accounts = vec![
            account("cash", AccountType::Cash, dec!(100)),
            account("bank", AccountType::Bank, dec!(0)),
        ];
        let txs = vec![tx("bank", dec!(20)), tx("cash", dec!(-10)), tx("bank", dec!(5))];
        let ledgers = running_balances(&accounts, &txs);
        assert_eq!(ledgers[0].entries.len(), 1);
        assert_eq!(ledgers[0].entries[0].balance, dec!(90));
        assert_eq!(ledgers[1].entries.iter().map(|e| e.balance).collect::<Vec<_>>(), vec![dec!(20), dec!(25)]);
    }

    #[test]
    fn test_account_totals_by_type() {
        let accounts = vec![
            account("a", AccountType::Cash, dec!(10)),
            account("b", AccountType::Cash, dec!(5)),
            account("c", AccountType::Bank, dec!(100)),
            account("d", AccountType::Credit, dec!(7)),
        ];
        let totals = account_totals(&accounts);
        assert_eq!(totals.cash_total, dec!(15));
        assert_eq!(totals.bank_total, dec!(100));
        assert_eq!(totals.credit_total, dec!(7));
        assert_eq!(totals.total(), final_balance(&accounts));
    }

    #[test]
    fn test_would_go_negative_boundary() {
        let cash = account("cash", AccountType::Cash, dec!(100));
        assert!(!would_go_negative(&cash, dec!(-100)));
        assert!(would_go_negative(&cash, dec!(-100.01)));
        assert!(!would_go_negative(&cash, dec!(50)));
    }

    #[test]
    fn test_credit_accounts_are_gated_too() {
        let credit = account("credit", AccountType::Credit, dec!(0));
        assert!(would_go_negative(&credit, dec!(-1)));
    }

    #[test]
    fn test_ensure_sufficient_reports_amounts() {
        let cash = account("cash", AccountType::Cash, dec!(1500));
        match ensure_sufficient(&cash, dec!(-2000)) {
            Err(LedgerError::InsufficientBalance { current, required, .. }) => {
                assert_eq!(current, dec!(1500));
                assert_eq!(required, dec!(2000));
            }
            other => panic!("Expected InsufficientBalance, got {:?}", other),
        }
    }

    #[test]
    fn test_balance_difference() {
        let mut cash = account("cash", AccountType::Cash, dec!(100));
        cash.current_balance = dec!(140);
        assert_eq!(balance_difference(&cash), dec!(40));
    }
}
