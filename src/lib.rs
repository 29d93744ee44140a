//! aledger: a minimal double-entry bookkeeping ledger.
//!
//! The ledger core lives in `aledger-core` (domain model, validation,
//! repository traits) and `aledger-memory` (in-memory repositories). This
//! crate wires them into the `LedgerService` and exposes it over HTTP.

pub mod config;
pub mod http;
pub mod service;

pub use aledger_core::{
    AccountView, Direction, EntryCommand, LedgerError, PostTransactionCommand,
    RegisterAccountCommand, Transaction, ValidationError,
};
pub use service::LedgerService;
