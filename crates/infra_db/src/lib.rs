//! Infrastructure Database Layer
//!
//! This crate provides PostgreSQL persistence for daily closures using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. `ClosureRepository` owns the SQL
//! and the row types; `PostgresClosureStore` adapts it to the ledger's
//! `ClosureStore` port and translates errors into `PortError`.
//!
//! # Storage Model
//!
//! Each closure is one row. Accounts, transactions, observations and the
//! final balance are kept in a JSONB document, so every mutation is a single
//! `UPDATE` and a closure can never be observed half-written. The owner, date
//! and status are real columns; the schema enforces one closure per user and
//! day and at most one open closure per user.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClosureStore};
//!
//! let pool = create_pool(DatabaseConfig::from_env()?).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresClosureStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repositories::ClosureRepository;
pub use adapters::PostgresClosureStore;
