//! Ledger Domain - Daily Cash Closures
//!
//! This crate implements the bookkeeping core of a daily cash-register
//! closure: a set of accounts snapshotted for one business day, the income and
//! expense transactions recorded against them, and the transfers moving money
//! between them.
//!
//! # Balance Rules
//!
//! - Every account satisfies `current = initial + sum(transaction amounts)`
//! - A closure's final balance is the sum of its accounts' current balances
//! - No mutation may leave an account below zero
//! - A transfer always exists as two linked legs that net to zero
//!
//! # Workflow
//!
//! Each transaction follows the ordered states of its concept, one step at a
//! time, until it reaches the concept's final state. A closure can only be
//! finalized once every non-transfer transaction is completed.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{ClosureService, InMemoryClosureStore, LedgerSettings};
//!
//! let service = ClosureService::new(store, LedgerSettings::default());
//! let closure = service.open_closure(&user, date, opening_balances).await?;
//!
//! service.add_transaction(closure.id, proposed).await?;
//! service.execute_transfer(closure.id, request).await?;
//! service.finalize_closure(closure.id).await?;
//! ```

pub mod account;
pub mod transaction;
pub mod concept;
pub mod balance;
pub mod lifecycle;
pub mod transfer;
pub mod closure;
pub mod cash_count;
pub mod reconciliation;
pub mod cash_flow;
pub mod descriptions;
pub mod ports;
pub mod adapters;
pub mod service;
pub mod settings;
pub mod error;

pub use account::{Account, AccountSpec, AccountType, StandardChart};
pub use transaction::{PaymentType, ProposedTransaction, Transaction};
pub use concept::{Concept, ConceptDefinition, ConceptRegistry, Polarity, State, StateDefinition};
pub use balance::{AccountTotals, BalanceDiscrepancy};
pub use lifecycle::{CreatedTransaction, DeletionOutcome, TransactionManager};
pub use transfer::{TransferManager, TransferOutcome, TransferRequest};
pub use closure::{Closure, ClosureLifecycle, ClosureStatus, OpeningBalance};
pub use cash_count::{CashCount, Denomination, DenominationKind, Tally};
pub use reconciliation::{AlertSeverity, ClosureAlert, ExternalPayment, PaymentLookup, PaymentMatch};
pub use cash_flow::{CashFlowEntry, Grouping, TimeRange, WaterfallStep};
pub use descriptions::DescriptionHistory;
pub use ports::{ClosureFields, ClosureStore, PaymentSource};
pub use adapters::{InMemoryClosureStore, StaticPaymentSource};
pub use service::ClosureService;
pub use settings::LedgerSettings;
pub use error::{LedgerError, ValidationError};
