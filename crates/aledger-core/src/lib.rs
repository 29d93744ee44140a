//! Core types and traits for aledger repository backends.
//!
//! This crate provides the ledger domain model, command validation and the
//! `AccountRepository` / `TransactionRepository` traits, enabling pluggable
//! storage implementations in separate crates.

pub mod models;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{Account, AccountEntry, AccountView, Amount, Direction, Transaction};
pub use models::write::{parse_id, EntryCommand, PostTransactionCommand, RegisterAccountCommand, ValidationError};
pub use storage::{AccountRepository, LedgerError, TransactionId, TransactionRepository};
