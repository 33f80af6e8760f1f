//! Port Adapters
//!
//! Implementations of the ledger's port traits on top of the repository
//! layer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClosureStore;
//! use domain_ledger::{ClosureService, LedgerSettings};
//!
//! let store = Arc::new(PostgresClosureStore::new(pool));
//! let service = ClosureService::new(store, LedgerSettings::load(None)?)?;
//! ```

pub mod closure;

pub use closure::PostgresClosureStore;
