//! Invoicing System Adapter
//!
//! This crate connects the ledger to the external invoicing/accounting system
//! through its REST API. It implements the ledger's `PaymentSource` port so
//! that closures can be reconciled against the payments recorded there.
//!
//! # Architecture
//!
//! - `InvoicingConfig`: connection settings, loaded from `INVOICING_*`
//!   environment variables
//! - `ManagerPaymentSource`: the reqwest-based adapter with retries and a
//!   circuit breaker
//! - `models`: wire types of the payments endpoint
//!
//! Reconciliation is advisory. Every failure surfaces as a `PortError`, which
//! the ledger turns into an informational alert.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_invoicing::{InvoicingConfig, ManagerPaymentSource};
//!
//! let source = ManagerPaymentSource::new(InvoicingConfig::from_env()?)?;
//! let service = ClosureService::new(store, settings)?.with_payment_source(Arc::new(source));
//! ```

pub mod circuit_breaker;
pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::ManagerPaymentSource;
pub use crate::config::InvoicingConfig;
pub use error::InvoicingError;
pub use models::{ManagerAmount, ManagerPayment, ManagerPaymentsResponse};
