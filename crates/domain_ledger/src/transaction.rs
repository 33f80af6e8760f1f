//! Transactions recorded against a closure

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, TransactionId, TransferId};

/// How money moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Bank,
    Credit,
    /// One leg of an inter-account transfer
    Transfer,
}

/// A single income or expense movement on one account
///
/// The amount is signed: positive for income, negative for expense. The
/// `concept` and `status` fields hold names from the concept registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Concept name
    pub concept: String,
    /// Free text
    pub description: String,
    /// Signed amount
    pub amount: Decimal,
    /// Current workflow state name
    pub status: String,
    /// Owning account
    pub account_id: AccountId,
    /// Creation instant
    pub timestamp: DateTime<Utc>,
    /// Shared by both legs of a transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<TransferId>,
    /// The account on the other side of a transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_account_id: Option<AccountId>,
    /// Payment type
    pub payment_type: PaymentType,
}

impl Transaction {
    /// Returns true if this is one leg of a transfer
    pub fn is_transfer(&self) -> bool {
        self.transfer_id.is_some() || self.payment_type == PaymentType::Transfer
    }

    /// Returns true if the amount is positive
    pub fn is_income(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Returns true if the amount is negative
    pub fn is_expense(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

/// Caller input for a new transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedTransaction {
    /// Concept name
    pub concept: String,
    /// Free text
    #[serde(default)]
    pub description: String,
    /// Target account
    pub account_id: AccountId,
    /// Amount as entered; the sign is normalized to the concept's polarity
    pub amount: Option<Decimal>,
    /// Payment type
    pub payment_type: PaymentType,
}

impl ProposedTransaction {
    /// Creates a cash transaction proposal
    pub fn new(concept: impl Into<String>, account_id: impl Into<AccountId>, amount: Decimal) -> Self {
        Self {
            concept: concept.into(),
            description: String::new(),
            account_id: account_id.into(),
            amount: Some(amount),
            payment_type: PaymentType::Cash,
        }
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the payment type
    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = payment_type;
        self
    }
}
