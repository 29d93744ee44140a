use uuid::Uuid;

use crate::models::{write::ValidationError, Account, Transaction};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("account not found: {0}")]
    AccountNotFound(Uuid),
    #[error("account already exists: {0}")]
    AccountAlreadyExists(Uuid),
    #[error("account with the specified name already exists: {0}")]
    AccountNameAlreadyExists(String),
    #[error("transaction entry with the specified id already exists: {0:?}")]
    AccountEntryAlreadyExists(Vec<Uuid>),
    #[error("transaction already exists: {0}")]
    TransactionAlreadyExists(Uuid),
    #[error("transaction not found: {0}")]
    TransactionNotFound(Uuid),
    #[error("unbalanced transaction: debits {debits}, credits {credits}")]
    TransactionUnbalanced { debits: i128, credits: i128 },
    #[error("account direction cannot change: {0}")]
    AccountDirectionChanged(Uuid),
    #[error("posted entries cannot be removed or altered: {0}")]
    AccountEntriesRewritten(Uuid),
    #[error("no active transaction")]
    NoActiveTransaction,
    #[error("transaction {0} is still active")]
    TransactionInProgress(TransactionId),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

pub type TransactionId = u64;

/// Store of accounts keyed by id, owning the global entry-id and name indexes.
///
/// Implementations hand out clones: mutating a returned `Account` never
/// touches stored state until it is passed back through `update`. An update
/// may rename an account or append entries, never drop or change stored
/// entries or flip its direction.
///
/// At most one transaction is active at a time. Rolling it back undoes every
/// `add` and `update` made since `begin_transaction`.
pub trait AccountRepository: Send + Sync {
    fn add(&self, account: &Account) -> Result<(), LedgerError>;
    fn update(&self, account: &Account) -> Result<(), LedgerError>;
    fn get(&self, id: Uuid) -> Result<Account, LedgerError>;
    fn exists(&self, id: Uuid) -> bool;
    fn list(&self) -> Vec<Account>;
    fn clear(&self);

    fn begin_transaction(&self) -> Result<TransactionId, LedgerError>;
    fn commit_transaction(&self, tx_id: TransactionId) -> Result<(), LedgerError>;
    fn rollback_transaction(&self, tx_id: TransactionId) -> Result<(), LedgerError>;
}

/// Append-only store of posted transactions.
pub trait TransactionRepository: Send + Sync {
    fn add(&self, txn: &Transaction) -> Result<(), LedgerError>;
    fn get(&self, id: Uuid) -> Result<Transaction, LedgerError>;
    fn exists(&self, id: Uuid) -> bool;
    fn list(&self) -> Vec<Transaction>;
    fn clear(&self);
}
