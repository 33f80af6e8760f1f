//! Repository layer
//!
//! SQL access and row types, independent of the ledger's port traits.

pub mod closure;

pub use closure::{ClosureDocument, ClosureDocumentPatch, ClosureRepository, ClosureRow};
