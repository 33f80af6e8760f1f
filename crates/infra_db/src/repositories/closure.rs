//! Closure repository implementation
//!
//! One row per closure; the mutable parts live in a JSONB document that is
//! patched with `||` so a partial update is a single statement.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use domain_ledger::{Account, Transaction};
use crate::error::DatabaseError;

/// Mutable contents of a closure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureDocument {
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub observations: String,
    pub final_balance: Decimal,
}

/// Keys of the document to overwrite; absent keys are kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureDocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<Account>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_balance: Option<Decimal>,
}

/// A row of the `closures` table
#[derive(Debug, Clone, FromRow)]
pub struct ClosureRow {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub status: String,
    pub document: Json<ClosureDocument>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for closure rows
///
/// # Example
///
/// ```rust,ignore
/// use infra_db::repositories::ClosureRepository;
///
/// let repo = ClosureRepository::new(pool);
/// let rows = repo.list_for_user("user-1").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ClosureRepository {
    pool: PgPool,
}

impl ClosureRepository {
    /// Creates a new ClosureRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves a closure row by id
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no row has the id
    pub async fn get(&self, id: Uuid) -> Result<ClosureRow, DatabaseError> {
        sqlx::query_as::<_, ClosureRow>(
            r#"
            SELECT id, user_id, date, status, document, created_at, updated_at
            FROM closures
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Closure", id))
    }

    /// Inserts a new closure row
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::DuplicateEntry` if the id, the user's date or
    /// the user's open slot is already taken
    pub async fn insert(&self, row: &ClosureRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO closures (id, user_id, date, status, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(row.id)
        .bind(&row.user_id)
        .bind(row.date)
        .bind(&row.status)
        .bind(&row.document)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Patches the document, status and timestamp in one statement
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no row has the id
    pub async fn update(
        &self,
        id: Uuid,
        patch: &ClosureDocumentPatch,
        status: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE closures
            SET document = document || $2,
                status = COALESCE($3, status),
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(patch))
        .bind(status)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Closure", id));
        }
        Ok(())
    }

    /// Deletes a closure row
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no row has the id
    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM closures WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Closure", id));
        }
        Ok(())
    }

    /// All closures of a user, oldest first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<ClosureRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClosureRow>(
            r#"
            SELECT id, user_id, date, status, document, created_at, updated_at
            FROM closures
            WHERE user_id = $1
            ORDER BY date ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
