//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for ledger types that give more
//! meaningful failure messages than standard assertions.

use core_kernel::AccountId;
use domain_ledger::balance::verify_consistency;
use domain_ledger::{Closure, ConceptRegistry};
use rust_decimal::Decimal;

/// Asserts that every stored balance agrees with the closure's transactions
///
/// # Panics
///
/// Panics listing each discrepancy if an account or the final balance is off
pub fn assert_balances_consistent(closure: &Closure) {
    let discrepancies = verify_consistency(closure);
    assert!(
        discrepancies.is_empty(),
        "Closure {} has inconsistent balances: {:?}",
        closure.id,
        discrepancies
    );
}

/// Asserts that no account of the closure is below zero
///
/// # Panics
///
/// Panics naming the first negative account
pub fn assert_no_negative_balances(closure: &Closure) {
    if let Some(account) = closure.accounts.iter().find(|a| a.current_balance < Decimal::ZERO) {
        panic!(
            "Account {} of closure {} is negative: {}",
            account.id, closure.id, account.current_balance
        );
    }
}

/// Asserts the current balance of one account
///
/// # Panics
///
/// Panics if the account is missing or its balance differs
pub fn assert_account_balance(closure: &Closure, account_id: &AccountId, expected: Decimal) {
    let account = closure
        .account(account_id)
        .unwrap_or_else(|| panic!("Account {} not found in closure {}", account_id, closure.id));
    assert_eq!(
        account.current_balance, expected,
        "Account {} balance mismatch: actual={}, expected={}",
        account_id, account.current_balance, expected
    );
}

/// Asserts that every transfer leg has exactly one partner and the pair nets to zero
///
/// # Panics
///
/// Panics on an orphaned leg, a pair that does not net to zero, or a pair
/// recorded on a single account
pub fn assert_transfers_paired(closure: &Closure) {
    for leg in closure.transactions.iter().filter(|t| t.transfer_id.is_some()) {
        let partners: Vec<_> = closure
            .transactions
            .iter()
            .filter(|t| t.transfer_id == leg.transfer_id && t.id != leg.id)
            .collect();
        assert_eq!(
            partners.len(),
            1,
            "Transfer leg {} has {} partners",
            leg.id,
            partners.len()
        );
        let partner = partners[0];
        assert_eq!(
            leg.amount + partner.amount,
            Decimal::ZERO,
            "Transfer legs {} and {} do not net to zero",
            leg.id,
            partner.id
        );
        assert_ne!(leg.account_id, partner.account_id, "Transfer {} stays on one account", leg.id);
    }
}

/// Asserts that the closure has no pending transactions
///
/// # Panics
///
/// Panics listing the pending transactions
pub fn assert_all_complete(closure: &Closure, registry: &ConceptRegistry) {
    let pending = registry.pending_transactions(&closure.transactions);
    assert!(
        pending.is_empty(),
        "Closure {} has {} pending transactions: {:?}",
        closure.id,
        pending.len(),
        pending.iter().map(|t| (&t.concept, &t.status)).collect::<Vec<_>>()
    );
}
