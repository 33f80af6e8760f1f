//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the ledger. The fixed instant falls at
//! midday in Montevideo so the business day never depends on the host clock.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{AccountId, FixedClock, UserId};
use domain_ledger::{AccountSpec, ConceptRegistry, OpeningBalance, StandardChart};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// 2024-03-15 12:00 in America/Montevideo
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 15, 0, 0).unwrap()
    }

    /// Business day of [`TemporalFixtures::now`]
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    pub fn yesterday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    pub fn tomorrow() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 16).unwrap()
    }

    /// A clock frozen at [`TemporalFixtures::now`]
    pub fn clock() -> FixedClock {
        FixedClock::new(Self::now())
    }
}

/// Fixture for account test data
pub struct AccountFixtures;

impl AccountFixtures {
    pub fn vault() -> AccountId {
        AccountId::new("account-1")
    }

    pub fn counter() -> AccountId {
        AccountId::new("account-2")
    }

    pub fn debit_bank() -> AccountId {
        AccountId::new("account-3")
    }

    pub fn credit_bank() -> AccountId {
        AccountId::new("account-4")
    }

    pub fn chart() -> Vec<AccountSpec> {
        StandardChart::accounts()
    }

    /// Opening balances of 1000, 500, 2000 and 0 for the standard chart
    pub fn opening_amounts() -> Vec<Decimal> {
        vec![dec!(1000.00), dec!(500.00), dec!(2000.00), dec!(0.00)]
    }

    /// Opening balances for the standard chart, as entered by a user
    pub fn opening_balances() -> Vec<OpeningBalance> {
        Self::chart()
            .into_iter()
            .zip(Self::opening_amounts())
            .map(|(spec, amount)| OpeningBalance::new(spec, amount.to_string()))
            .collect()
    }
}

/// Fixture for concept names of the standard registry
pub struct ConceptFixtures;

impl ConceptFixtures {
    pub fn sales() -> &'static str {
        "(+) Sales income"
    }

    pub fn other_income() -> &'static str {
        "(+) Other income"
    }

    pub fn suppliers() -> &'static str {
        "(-) Supplier payments"
    }

    pub fn utilities() -> &'static str {
        "(-) Utility payments"
    }

    pub fn salaries() -> &'static str {
        "(-) Salaries"
    }

    pub fn registry() -> ConceptRegistry {
        ConceptRegistry::standard()
    }
}

/// Fixture for user test data
pub struct UserFixtures;

impl UserFixtures {
    pub fn owner() -> UserId {
        UserId::new("user-owner")
    }

    pub fn other() -> UserId {
        UserId::new("user-other")
    }
}
