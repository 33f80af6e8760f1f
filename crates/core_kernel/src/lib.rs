//! Core Kernel - Foundational types and utilities for the cash-closure ledger
//!
//! This crate provides the fundamental building blocks used across all crates:
//! - Strongly-typed identifiers for closures, transactions, transfers and accounts
//! - Business time handling (timezone-aware "today", injectable clocks)
//! - Port infrastructure shared by persistence and external adapters

pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use temporal::{Timezone, Clock, SystemClock, FixedClock, DateRange, TemporalError};
pub use identifiers::{ClosureId, TransactionId, TransferId, AccountId, UserId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, CircuitBreakerConfig,
    AdapterHealth, HealthCheckResult, HealthCheckable,
};
