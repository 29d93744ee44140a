use std::{
    collections::HashSet,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use uuid::Uuid;

use aledger_core::{LedgerError, Transaction, TransactionRepository};

#[derive(Default)]
struct TransactionState {
    data: Vec<Transaction>,
    ids: HashSet<Uuid>,
}

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    state: RwLock<TransactionState>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, TransactionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TransactionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionRepository for InMemoryTransactionRepository {
    fn add(&self, txn: &Transaction) -> Result<(), LedgerError> {
        let mut state = self.write();
        if !state.ids.insert(txn.id()) {
            return Err(LedgerError::TransactionAlreadyExists(txn.id()));
        }
        state.data.push(txn.clone());
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Transaction, LedgerError> {
        self.read().data.iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    fn exists(&self, id: Uuid) -> bool {
        self.read().ids.contains(&id)
    }

    fn list(&self) -> Vec<Transaction> {
        self.read().data.clone()
    }

    fn clear(&self) {
        *self.write() = TransactionState::default();
    }
}
