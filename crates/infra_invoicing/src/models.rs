//! Wire types of the invoicing API payments endpoint

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use domain_ledger::ExternalPayment;

/// Body of `GET /payments?date=YYYY-MM-DD`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerPaymentsResponse {
    /// Anything other than a list is read as no payments
    #[serde(default, deserialize_with = "list_or_empty")]
    pub payments: Vec<ManagerPayment>,
}

fn list_or_empty<'de, D>(deserializer: D) -> Result<Vec<ManagerPayment>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_array() {
        serde_json::from_value(value).map_err(serde::de::Error::custom)
    } else {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerPayment {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub date: Option<String>,
    /// Account the payment left from
    #[serde(default)]
    pub paid_from: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payee: Option<String>,
    pub amount: ManagerAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerAmount {
    pub value: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl From<ManagerPayment> for ExternalPayment {
    /// Amounts are compared as magnitudes rounded to cents; the payment
    /// description serves as the reference.
    fn from(payment: ManagerPayment) -> Self {
        ExternalPayment {
            amount: payment.amount.value.abs().round_dp(2),
            payee: non_blank(payment.payee),
            reference: non_blank(payment.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_payments() {
        let body = r#"{
            "payments": [
                {
                    "key": "6f1c",
                    "date": "2024-03-15",
                    "paidFrom": "Caja",
                    "description": "Invoice 1043",
                    "payee": "Conaprole",
                    "amount": { "value": 320.5, "currency": "UYU" }
                },
                {
                    "key": "7a2d",
                    "description": null,
                    "amount": { "value": 99 }
                }
            ]
        }"#;

        let response: ManagerPaymentsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.payments.len(), 2);
        assert_eq!(response.payments[0].paid_from.as_deref(), Some("Caja"));
        assert_eq!(response.payments[0].amount.value, dec!(320.5));
        assert!(response.payments[1].payee.is_none());
    }

    #[test]
    fn test_non_list_payments_read_as_empty() {
        let response: ManagerPaymentsResponse = serde_json::from_str(r#"{"payments": {"error": "x"}}"#).unwrap();
        assert!(response.payments.is_empty());

        let response: ManagerPaymentsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.payments.is_empty());
    }

    #[test]
    fn test_into_external_payment() {
        let payment = ManagerPayment {
            key: "k".to_string(),
            date: None,
            paid_from: None,
            description: Some("  ".to_string()),
            payee: Some(" Conaprole ".to_string()),
            amount: ManagerAmount {
                value: dec!(-120.456),
                currency: None,
            },
        };

        let external = ExternalPayment::from(payment);
        assert_eq!(external.amount, dec!(120.46));
        assert_eq!(external.payee.as_deref(), Some("Conaprole"));
        assert!(external.reference.is_none());
    }
}
