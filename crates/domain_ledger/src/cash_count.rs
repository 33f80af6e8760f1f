//! Counting a cash drawer by denomination
//!
//! The count is entered as a quantity per bill and coin; its total becomes a
//! transaction amount or the opening balance of a cash account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::AccountSpec;
use crate::closure::OpeningBalance;
use crate::error::ValidationError;

/// Bill values, largest first
pub const BILLS: [u32; 7] = [2000, 1000, 500, 200, 100, 50, 20];

/// Coin values, largest first
pub const COINS: [u32; 5] = [50, 10, 5, 2, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenominationKind {
    Bill,
    Coin,
}

/// One bill or coin value
///
/// Bills and coins of the same value are counted separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Denomination {
    pub kind: DenominationKind,
    pub value: u32,
}

impl Denomination {
    pub const fn bill(value: u32) -> Self {
        Self {
            kind: DenominationKind::Bill,
            value,
        }
    }

    pub const fn coin(value: u32) -> Self {
        Self {
            kind: DenominationKind::Coin,
            value,
        }
    }

    /// Whether the value is in the drawer's set of bills or coins
    pub fn is_known(&self) -> bool {
        match self.kind {
            DenominationKind::Bill => BILLS.contains(&self.value),
            DenominationKind::Coin => COINS.contains(&self.value),
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DenominationKind::Bill => write!(f, "bill of {}", self.value),
            DenominationKind::Coin => write!(f, "coin of {}", self.value),
        }
    }
}

/// Every denomination in counting order: bills, then coins
pub fn denominations() -> impl Iterator<Item = Denomination> {
    BILLS
        .iter()
        .map(|&value| Denomination::bill(value))
        .chain(COINS.iter().map(|&value| Denomination::coin(value)))
}

/// Quantity counted for one denomination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub denomination: Denomination,
    pub quantity: u32,
}

impl Tally {
    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.denomination.value) * Decimal::from(self.quantity)
    }
}

/// A drawer count with one tally per denomination, in counting order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tally>", into = "Vec<Tally>")]
pub struct CashCount {
    tallies: Vec<Tally>,
}

impl CashCount {
    /// A count with every quantity at zero
    pub fn new() -> Self {
        Self {
            tallies: denominations()
                .map(|denomination| Tally {
                    denomination,
                    quantity: 0,
                })
                .collect(),
        }
    }

    /// Sets the quantity of one denomination
    ///
    /// # Errors
    ///
    /// - `UnknownDenomination` if the value is not one of the drawer's bills or coins
    /// - `InvalidQuantity` if the quantity is negative or too large
    pub fn set(&mut self, denomination: Denomination, quantity: i64) -> Result<(), ValidationError> {
        let tally = self
            .tallies
            .iter_mut()
            .find(|t| t.denomination == denomination)
            .ok_or(ValidationError::UnknownDenomination(denomination))?;

        tally.quantity = u32::try_from(quantity).map_err(|_| ValidationError::InvalidQuantity {
            denomination,
            quantity,
        })?;
        Ok(())
    }

    /// Builder form of [`CashCount::set`]
    pub fn with(mut self, denomination: Denomination, quantity: i64) -> Result<Self, ValidationError> {
        self.set(denomination, quantity)?;
        Ok(self)
    }

    pub fn quantity(&self, denomination: Denomination) -> u32 {
        self.tallies
            .iter()
            .find(|t| t.denomination == denomination)
            .map_or(0, |t| t.quantity)
    }

    pub fn subtotal(&self, denomination: Denomination) -> Decimal {
        Decimal::from(denomination.value) * Decimal::from(self.quantity(denomination))
    }

    /// Sum of value times quantity over all denominations
    pub fn total(&self) -> Decimal {
        self.tallies.iter().map(Tally::subtotal).sum()
    }

    pub fn tallies(&self) -> &[Tally] {
        &self.tallies
    }

    pub fn reset(&mut self) {
        for tally in &mut self.tallies {
            tally.quantity = 0;
        }
    }

    /// The counted total as the opening balance of an account
    pub fn opening_balance(&self, account: AccountSpec) -> OpeningBalance {
        OpeningBalance::new(account, self.total().to_string())
    }
}

impl Default for CashCount {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Tally>> for CashCount {
    type Error = ValidationError;

    fn try_from(tallies: Vec<Tally>) -> Result<Self, Self::Error> {
        let mut count = Self::new();
        for tally in tallies {
            count.set(tally.denomination, i64::from(tally.quantity))?;
        }
        Ok(count)
    }
}

impl From<CashCount> for Vec<Tally> {
    fn from(count: CashCount) -> Self {
        count.tallies
    }
}
