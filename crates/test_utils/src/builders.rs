//! Test Data Builders
//!
//! Provides builder patterns for constructing closures and transactions with
//! sensible defaults. Tests specify only the fields they care about.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{AccountId, ClosureId, TransactionId, UserId};
use domain_ledger::{Account, Closure, ClosureStatus, PaymentType, Transaction};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{AccountFixtures, ConceptFixtures, TemporalFixtures, UserFixtures};

/// Builder for a transaction stored directly in a closure
///
/// Unlike going through the transaction manager, nothing is validated; use
/// it to seed closures with arbitrary states.
pub struct TestTransactionBuilder {
    concept: String,
    description: String,
    amount: Decimal,
    status: String,
    account_id: AccountId,
    timestamp: DateTime<Utc>,
    payment_type: PaymentType,
}

impl Default for TestTransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTransactionBuilder {
    /// A completed sales income of 100 on the vault
    pub fn new() -> Self {
        Self {
            concept: ConceptFixtures::sales().to_string(),
            description: String::new(),
            amount: dec!(100.00),
            status: "Completed".to_string(),
            account_id: AccountFixtures::vault(),
            timestamp: TemporalFixtures::now(),
            payment_type: PaymentType::Cash,
        }
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = concept.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the signed amount
    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            concept: self.concept,
            description: self.description,
            amount: self.amount,
            status: self.status,
            account_id: self.account_id,
            timestamp: self.timestamp,
            transfer_id: None,
            related_account_id: None,
            payment_type: self.payment_type,
        }
    }
}

/// Builder for a closure on the standard chart
pub struct TestClosureBuilder {
    date: NaiveDate,
    user_id: UserId,
    status: ClosureStatus,
    opening: Vec<Decimal>,
    transactions: Vec<Transaction>,
    observations: String,
}

impl Default for TestClosureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClosureBuilder {
    /// An open closure for today with the fixture opening balances
    pub fn new() -> Self {
        Self {
            date: TemporalFixtures::today(),
            user_id: UserFixtures::owner(),
            status: ClosureStatus::Open,
            opening: AccountFixtures::opening_amounts(),
            transactions: Vec::new(),
            observations: String::new(),
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    /// Opening balances, in chart order
    pub fn with_opening(mut self, opening: Vec<Decimal>) -> Self {
        self.opening = opening;
        self
    }

    /// Adds a transaction; its amount is applied to the account on build
    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn with_observations(mut self, observations: impl Into<String>) -> Self {
        self.observations = observations.into();
        self
    }

    pub fn closed(mut self) -> Self {
        self.status = ClosureStatus::Closed;
        self
    }

    pub fn build(self) -> Closure {
        let mut accounts: Vec<Account> = AccountFixtures::chart()
            .into_iter()
            .zip(self.opening.iter().copied().chain(std::iter::repeat(Decimal::ZERO)))
            .map(|(spec, amount)| Account::open(spec, amount))
            .collect();

        for transaction in &self.transactions {
            if let Some(account) = accounts.iter_mut().find(|a| a.id == transaction.account_id) {
                account.current_balance += transaction.amount;
            }
        }

        let now = TemporalFixtures::now();
        let mut closure = Closure {
            id: ClosureId::new(),
            date: self.date,
            status: self.status,
            accounts,
            transactions: self.transactions,
            observations: self.observations,
            user_id: self.user_id,
            final_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        closure.recompute_final_balance();
        closure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_builder_applies_transactions() {
        let closure = TestClosureBuilder::new()
            .with_transaction(TestTransactionBuilder::new().with_amount(dec!(250.00)).build())
            .with_transaction(
                TestTransactionBuilder::new()
                    .with_concept(ConceptFixtures::salaries())
                    .with_account(AccountFixtures::debit_bank())
                    .with_amount(dec!(-300.00))
                    .build(),
            )
            .build();

        assert_eq!(closure.account(&AccountFixtures::vault()).unwrap().current_balance, dec!(1250.00));
        assert_eq!(closure.account(&AccountFixtures::debit_bank()).unwrap().current_balance, dec!(1700.00));
        assert_eq!(closure.final_balance, dec!(3450.00));
    }
}
