//! In-memory repository backend for aledger.
//!
//! State lives for the lifetime of the process only. Both repositories are
//! internally synchronised and can be shared behind an `Arc`.

mod accounts;
mod transactions;

pub use accounts::InMemoryAccountRepository;
pub use transactions::InMemoryTransactionRepository;
