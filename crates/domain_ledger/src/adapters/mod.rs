//! In-process adapters for the ledger ports

pub mod memory;

pub use memory::{InMemoryClosureStore, StaticPaymentSource};
