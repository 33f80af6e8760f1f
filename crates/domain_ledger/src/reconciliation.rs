//! Reconciliation against the external invoicing system
//!
//! Payments recorded in a closure are compared with the payments the
//! invoicing system knows for the same day. The result is advisory only:
//! alerts are shown to the user and never block a ledger mutation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::TransactionId;
use crate::closure::Closure;
use crate::transaction::Transaction;

/// Amounts closer than this are counted as the same amount
pub const MATCH_TOLERANCE: Decimal = dec!(0.01);

/// A payment as recorded by the invoicing system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPayment {
    pub amount: Decimal,
    #[serde(default)]
    pub payee: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl ExternalPayment {
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            payee: None,
            reference: None,
        }
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Returns true if the payee or reference appears in the text
    fn mentioned_in(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        [self.payee.as_deref(), self.reference.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .any(|s| text.contains(&s.to_lowercase()))
    }
}

/// Outcome of matching one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PaymentMatch {
    /// An external payment has the same amount
    Matched { payment: ExternalPayment },
    /// An external payment names this transaction but disagrees on the amount
    AmountMismatch {
        payment: ExternalPayment,
        difference: Decimal,
    },
    /// No external payment corresponds
    NotFound,
}

/// Matches a transaction against the day's external payments
///
/// The absolute transaction amount is compared with each payment amount; a
/// difference strictly below `MATCH_TOLERANCE` is a match. Failing that, a payment
/// whose payee or reference appears in the transaction description is
/// reported as an amount mismatch.
pub fn match_payment(transaction: &Transaction, payments: &[ExternalPayment]) -> PaymentMatch {
    let amount = transaction.amount.abs();

    if let Some(payment) = payments
        .iter()
        .find(|p| (p.amount - amount).abs() < MATCH_TOLERANCE)
    {
        return PaymentMatch::Matched {
            payment: payment.clone(),
        };
    }

    match payments.iter().find(|p| p.mentioned_in(&transaction.description)) {
        Some(payment) => PaymentMatch::AmountMismatch {
            payment: payment.clone(),
            difference: (payment.amount - amount).abs(),
        },
        None => PaymentMatch::NotFound,
    }
}

/// What the invoicing system returned for the closure's date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentLookup {
    Available(Vec<ExternalPayment>),
    /// The lookup failed or timed out
    Unavailable(String),
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

/// Extra data attached to an amount-mismatch alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDetails {
    pub external_amount: Decimal,
    pub difference: Decimal,
    pub payee: Option<String>,
    pub reference: Option<String>,
}

/// An advisory message about a closure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureAlert {
    pub id: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub transaction_id: Option<TransactionId>,
    pub details: Option<AlertDetails>,
}

/// Builds the reconciliation alerts for a closure
///
/// Only expense transactions whose concept is listed in `reconciled_concepts`
/// are checked; transfer legs never are. An unavailable lookup yields a
/// single informational alert.
pub fn closure_alerts(closure: &Closure, lookup: &PaymentLookup, reconciled_concepts: &[String]) -> Vec<ClosureAlert> {
    let payments = match lookup {
        PaymentLookup::Available(payments) => payments,
        PaymentLookup::Unavailable(reason) => {
            return vec![ClosureAlert {
                id: "reconciliation-unavailable".to_string(),
                severity: AlertSeverity::Info,
                title: "Reconciliation unavailable".to_string(),
                message: format!("External payments could not be checked: {}", reason),
                transaction_id: None,
                details: None,
            }];
        }
    };

    closure
        .transactions
        .iter()
        .filter(|t| !t.is_transfer() && t.is_expense())
        .filter(|t| reconciled_concepts.iter().any(|c| c == &t.concept))
        .filter_map(|t| match match_payment(t, payments) {
            PaymentMatch::Matched { .. } => None,
            PaymentMatch::NotFound => Some(ClosureAlert {
                id: format!("payment-{}", t.id),
                severity: AlertSeverity::Warning,
                title: "Payment without external record".to_string(),
                message: format!(
                    "The payment of {} does not match any payment in the invoicing system",
                    t.amount.abs()
                ),
                transaction_id: Some(t.id),
                details: None,
            }),
            PaymentMatch::AmountMismatch { payment, difference } => Some(ClosureAlert {
                id: format!("mismatch-{}", t.id),
                severity: AlertSeverity::Error,
                title: "Amount mismatch".to_string(),
                message: format!(
                    "The payment of {} differs from the recorded {} by {}",
                    t.amount.abs(),
                    payment.amount,
                    difference
                ),
                transaction_id: Some(t.id),
                details: Some(AlertDetails {
                    external_amount: payment.amount,
                    difference,
                    payee: payment.payee,
                    reference: payment.reference,
                }),
            }),
        })
        .collect()
}
