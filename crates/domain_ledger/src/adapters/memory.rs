//! In-memory adapters
//!
//! Used by tests and by embedders that keep closures in process.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use core_kernel::{
    AdapterHealth, ClosureId, DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId,
};
use crate::closure::Closure;
use crate::ports::{ClosureFields, ClosureStore, PaymentSource};
use crate::reconciliation::ExternalPayment;

/// Closure store backed by a shared map
#[derive(Debug, Clone, Default)]
pub struct InMemoryClosureStore {
    closures: Arc<RwLock<HashMap<ClosureId, Closure>>>,
}

impl InMemoryClosureStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates with closures
    pub async fn with_closures(closures: Vec<Closure>) -> Self {
        let store = Self::new();
        {
            let mut map = store.closures.write().await;
            for closure in closures {
                map.insert(closure.id, closure);
            }
        }
        store
    }

    /// Number of stored closures
    pub async fn len(&self) -> usize {
        self.closures.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.closures.read().await.is_empty()
    }
}

impl DomainPort for InMemoryClosureStore {}

#[async_trait]
impl HealthCheckable for InMemoryClosureStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::new(
            "memory-closure-store",
            AdapterHealth::Healthy,
            0,
            Some("In-memory store always healthy".to_string()),
        )
    }
}

#[async_trait]
impl ClosureStore for InMemoryClosureStore {
    async fn read_closure(&self, id: &ClosureId) -> Result<Closure, PortError> {
        self.closures
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Closure", id))
    }

    async fn create_closure(&self, closure: &Closure) -> Result<(), PortError> {
        let mut closures = self.closures.write().await;
        if closures.contains_key(&closure.id) {
            return Err(PortError::conflict(format!("closure {} already exists", closure.id)));
        }
        closures.insert(closure.id, closure.clone());
        Ok(())
    }

    async fn write_closure_fields(&self, id: &ClosureId, fields: ClosureFields) -> Result<(), PortError> {
        let mut closures = self.closures.write().await;
        let closure = closures
            .get_mut(id)
            .ok_or_else(|| PortError::not_found("Closure", id))?;
        fields.apply_to(closure);
        Ok(())
    }

    async fn delete_closure(&self, id: &ClosureId) -> Result<(), PortError> {
        self.closures
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("Closure", id))
    }

    async fn list_closures_for_user(&self, user_id: &UserId) -> Result<Vec<Closure>, PortError> {
        let mut closures: Vec<Closure> = self
            .closures
            .read()
            .await
            .values()
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .collect();
        closures.sort_by_key(|c| c.date);
        Ok(closures)
    }
}

/// Payment source serving fixed data
///
/// Can be made to fail or to respond slowly, to exercise the degraded paths
/// of reconciliation.
#[derive(Debug, Clone, Default)]
pub struct StaticPaymentSource {
    payments: Arc<RwLock<HashMap<NaiveDate, Vec<ExternalPayment>>>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl StaticPaymentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose every lookup fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Delays every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the payments returned for a date
    pub async fn set_payments(&self, date: NaiveDate, payments: Vec<ExternalPayment>) {
        self.payments.write().await.insert(date, payments);
    }
}

impl DomainPort for StaticPaymentSource {}

#[async_trait]
impl HealthCheckable for StaticPaymentSource {
    async fn health_check(&self) -> HealthCheckResult {
        let status = if self.failure.is_some() {
            AdapterHealth::Unhealthy
        } else {
            AdapterHealth::Healthy
        };
        HealthCheckResult {
            adapter_id: "static-payment-source".to_string(),
            status,
            latency_ms: 0,
            message: self.failure.clone(),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl PaymentSource for StaticPaymentSource {
    async fn fetch_external_payments_for_date(&self, date: NaiveDate) -> Result<Vec<ExternalPayment>, PortError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(PortError::unavailable(message.clone()));
        }
        Ok(self
            .payments
            .read()
            .await
            .get(&date)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::ClosureStatus;
    use rust_decimal::Decimal;

    fn closure(user: &str, date: NaiveDate) -> Closure {
        let now = Utc::now();
        Closure {
            id: ClosureId::new(),
            date,
            status: ClosureStatus::Closed,
            accounts: vec![],
            transactions: vec![],
            observations: String::new(),
            user_id: UserId::new(user),
            final_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_user_and_sorts_by_date() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let store = InMemoryClosureStore::with_closures(vec![
            closure("alice", d1),
            closure("alice", d2),
            closure("bob", d1),
        ])
        .await;

        let listed = store.list_closures_for_user(&UserId::new("alice")).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].date, d2);
    }

    #[tokio::test]
    async fn test_write_fields_is_partial() {
        let c = closure("alice", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let store = InMemoryClosureStore::with_closures(vec![c.clone()]).await;

        let mut fields = ClosureFields::touch(Utc::now());
        fields.observations = Some("counted twice".to_string());
        store.write_closure_fields(&c.id, fields).await.unwrap();

        let stored = store.read_closure(&c.id).await.unwrap();
        assert_eq!(stored.observations, "counted twice");
        assert_eq!(stored.status, ClosureStatus::Closed);
    }

    #[tokio::test]
    async fn test_missing_closure_is_not_found() {
        let store = InMemoryClosureStore::new();
        let err = store.read_closure(&ClosureId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failing_payment_source() {
        let source = StaticPaymentSource::failing("invoicing down");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(source.fetch_external_payments_for_date(date).await.is_err());
    }
}
