//! PostgreSQL Closure Adapter
//!
//! Implements the ledger's `ClosureStore` port with `ClosureRepository`,
//! translating between closures and rows and between database and port
//! errors.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, ClosureId, DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId,
};
use domain_ledger::{Closure, ClosureFields, ClosureStatus, ClosureStore};

use crate::repositories::{ClosureDocument, ClosureDocumentPatch, ClosureRepository, ClosureRow};

const ADAPTER_ID: &str = "postgres-closure-store";

/// PostgreSQL-backed implementation of the ClosureStore port
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - `DatabaseError::DuplicateEntry` -> `PortError::Conflict`
/// - connection failures -> `PortError::Connection`
/// - Other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresClosureStore {
    repository: ClosureRepository,
    pool: PgPool,
}

impl PostgresClosureStore {
    /// Creates a new store over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClosureRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &ClosureRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClosureStore {}

#[async_trait]
impl HealthCheckable for PostgresClosureStore {
    /// Performs a SELECT 1 to verify the pool is operational
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::new(ADAPTER_ID, AdapterHealth::Healthy, latency_ms, None),
            Err(e) => HealthCheckResult::new(
                ADAPTER_ID,
                AdapterHealth::Unhealthy,
                latency_ms,
                Some(format!("Database error: {}", e)),
            ),
        }
    }
}

#[async_trait]
impl ClosureStore for PostgresClosureStore {
    #[instrument(skip(self), fields(closure_id = %id))]
    async fn read_closure(&self, id: &ClosureId) -> Result<Closure, PortError> {
        debug!("Reading closure");
        let row = self.repository.get(*id.as_uuid()).await?;
        row_to_closure(row)
    }

    #[instrument(skip(self, closure), fields(closure_id = %closure.id, user_id = %closure.user_id))]
    async fn create_closure(&self, closure: &Closure) -> Result<(), PortError> {
        debug!("Creating closure");
        self.repository.insert(&closure_to_row(closure)).await?;
        Ok(())
    }

    #[instrument(skip(self, changes), fields(closure_id = %id))]
    async fn write_closure_fields(&self, id: &ClosureId, changes: ClosureFields) -> Result<(), PortError> {
        debug!("Writing closure fields");
        let patch = ClosureDocumentPatch {
            accounts: changes.accounts,
            transactions: changes.transactions,
            observations: changes.observations,
            final_balance: changes.final_balance,
        };
        self.repository
            .update(
                *id.as_uuid(),
                &patch,
                changes.status.map(|s| s.as_str()),
                changes.updated_at,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(closure_id = %id))]
    async fn delete_closure(&self, id: &ClosureId) -> Result<(), PortError> {
        debug!("Deleting closure");
        self.repository.delete(*id.as_uuid()).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_closures_for_user(&self, user_id: &UserId) -> Result<Vec<Closure>, PortError> {
        debug!("Listing closures");
        self.repository
            .list_for_user(user_id.as_str())
            .await?
            .into_iter()
            .map(row_to_closure)
            .collect()
    }
}

fn parse_status(status: &str) -> Result<ClosureStatus, PortError> {
    match status {
        "open" => Ok(ClosureStatus::Open),
        "closed" => Ok(ClosureStatus::Closed),
        other => Err(PortError::transformation(format!("unknown closure status '{}'", other))),
    }
}

fn row_to_closure(row: ClosureRow) -> Result<Closure, PortError> {
    let status = parse_status(&row.status)?;
    let Json(document) = row.document;
    Ok(Closure {
        id: ClosureId::from(row.id),
        date: row.date,
        status,
        accounts: document.accounts,
        transactions: document.transactions,
        observations: document.observations,
        user_id: UserId::new(row.user_id),
        final_balance: document.final_balance,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn closure_to_row(closure: &Closure) -> ClosureRow {
    ClosureRow {
        id: *closure.id.as_uuid(),
        user_id: closure.user_id.as_str().to_string(),
        date: closure.date,
        status: closure.status.as_str().to_string(),
        document: Json(ClosureDocument {
            accounts: closure.accounts.clone(),
            transactions: closure.transactions.clone(),
            observations: closure.observations.clone(),
            final_balance: closure.final_balance,
        }),
        created_at: closure.created_at,
        updated_at: closure.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{TestClosureBuilder, TestTransactionBuilder};

    #[test]
    fn test_row_round_trip_keeps_closure() {
        let closure = TestClosureBuilder::new()
            .with_transaction(TestTransactionBuilder::new().with_description("Rolls").build())
            .with_observations("Power cut at noon")
            .closed()
            .build();

        let row = closure_to_row(&closure);
        assert_eq!(row.status, "closed");
        assert_eq!(row_to_closure(row).unwrap(), closure);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let mut row = closure_to_row(&TestClosureBuilder::new().build());
        row.status = "archived".to_string();
        assert!(matches!(row_to_closure(row), Err(PortError::Transformation { .. })));
    }
}
