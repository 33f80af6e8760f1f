//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating ledger operations that keep
//! amounts at two decimal places.

use core_kernel::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::fixtures::{AccountFixtures, ConceptFixtures};

/// Strategy for positive amounts between 0.01 and 5000.00
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for opening balances between 0.00 and 10000.00
pub fn opening_balance_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for an account of the standard chart
pub fn account_strategy() -> impl Strategy<Value = AccountId> {
    prop_oneof![
        Just(AccountFixtures::vault()),
        Just(AccountFixtures::counter()),
        Just(AccountFixtures::debit_bank()),
        Just(AccountFixtures::credit_bank()),
    ]
}

/// Strategy for a concept of the standard registry
pub fn concept_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(ConceptFixtures::sales().to_string()),
        Just(ConceptFixtures::other_income().to_string()),
        Just(ConceptFixtures::suppliers().to_string()),
        Just(ConceptFixtures::utilities().to_string()),
        Just(ConceptFixtures::salaries().to_string()),
        Just("(-) Other expenses".to_string()),
    ]
}

/// One mutation applied to a closure in a generated sequence
#[derive(Debug, Clone)]
pub enum LedgerOp {
    Add {
        concept: String,
        account_id: AccountId,
        amount: Decimal,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    },
    /// Advances the transaction at this index modulo the transaction count
    Advance(usize),
    /// Deletes the transaction at this index modulo the transaction count
    Delete(usize),
}

/// Strategy for a single ledger operation
pub fn ledger_op_strategy() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        4 => (concept_strategy(), account_strategy(), positive_amount_strategy())
            .prop_map(|(concept, account_id, amount)| LedgerOp::Add { concept, account_id, amount }),
        2 => (account_strategy(), account_strategy(), positive_amount_strategy())
            .prop_map(|(from, to, amount)| LedgerOp::Transfer { from, to, amount }),
        2 => any::<usize>().prop_map(LedgerOp::Advance),
        1 => any::<usize>().prop_map(LedgerOp::Delete),
    ]
}

/// Strategy for a sequence of up to `max` ledger operations
pub fn ledger_ops_strategy(max: usize) -> impl Strategy<Value = Vec<LedgerOp>> {
    prop::collection::vec(ledger_op_strategy(), 0..max)
}
