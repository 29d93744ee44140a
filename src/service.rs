use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use aledger_core::{
    Account, AccountRepository, AccountView, EntryCommand, LedgerError, PostTransactionCommand,
    RegisterAccountCommand, Transaction, TransactionRepository,
};
use aledger_memory::{InMemoryAccountRepository, InMemoryTransactionRepository};

/// Entry point for ledger use cases.
///
/// Mutating operations are serialised by a ledger-wide lock, and a posting
/// runs inside an account repository transaction so that either every
/// account update and the transaction record are stored, or none are.
pub struct LedgerService {
    accounts: Arc<dyn AccountRepository>,
    transactions: Arc<dyn TransactionRepository>,
    ledger_lock: RwLock<()>,
}

impl LedgerService {
    pub fn new(accounts: Arc<dyn AccountRepository>, transactions: Arc<dyn TransactionRepository>) -> Self {
        Self {
            accounts,
            transactions,
            ledger_lock: RwLock::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(InMemoryTransactionRepository::new()),
        )
    }

    pub fn register_account(&self, command: &RegisterAccountCommand) -> Result<AccountView, LedgerError> {
        let _guard = self.ledger_lock.write().unwrap_or_else(PoisonError::into_inner);

        let account = Account::new(command.id(), command.name(), command.direction());
        self.accounts.add(&account)?;

        tracing::info!(account_id = %account.id(), name = account.name(), direction = %account.direction(), "Account registered");
        metrics::increment_counter!("aledger_accounts_registered_total");
        Ok(account.view())
    }

    pub fn post_transaction(&self, command: &PostTransactionCommand) -> Result<Transaction, LedgerError> {
        let entries = command.entries().iter().map(EntryCommand::to_entry).collect();
        let txn = Transaction::new(command.id(), entries);

        if !txn.is_balanced() {
            let (debits, credits) = txn.totals();
            tracing::warn!(transaction_id = %txn.id(), %debits, %credits, "Rejected unbalanced transaction");
            metrics::increment_counter!("aledger_transactions_rejected_total");
            return Err(LedgerError::TransactionUnbalanced { debits, credits });
        }

        let _guard = self.ledger_lock.write().unwrap_or_else(PoisonError::into_inner);
        let tx_id = self.accounts.begin_transaction()?;

        match self.apply_transaction(&txn) {
            Ok(()) => {
                self.accounts.commit_transaction(tx_id)?;
                tracing::info!(transaction_id = %txn.id(), entries = txn.entries().len(), "Transaction posted");
                metrics::increment_counter!("aledger_transactions_posted_total");
                Ok(txn)
            }
            Err(e) => {
                self.accounts.rollback_transaction(tx_id)?;
                tracing::warn!(transaction_id = %txn.id(), error = %e, "Rejected transaction");
                metrics::increment_counter!("aledger_transactions_rejected_total");
                Err(e)
            }
        }
    }

    fn apply_transaction(&self, txn: &Transaction) -> Result<(), LedgerError> {
        for entry in txn.entries() {
            let mut account = self.accounts.get(entry.account_id())?;
            account.add_entry(entry.direction(), entry.amount(), Some(entry.id()))?;
            self.accounts.update(&account)?;
        }
        self.transactions.add(txn)
    }

    pub fn retrieve_account(&self, id: Uuid) -> Result<AccountView, LedgerError> {
        let _guard = self.ledger_lock.read().unwrap_or_else(PoisonError::into_inner);
        Ok(self.accounts.get(id)?.view())
    }

    pub fn retrieve_transaction(&self, id: Uuid) -> Result<Transaction, LedgerError> {
        let _guard = self.ledger_lock.read().unwrap_or_else(PoisonError::into_inner);
        self.transactions.get(id)
    }

    pub fn list_accounts(&self) -> Vec<AccountView> {
        let _guard = self.ledger_lock.read().unwrap_or_else(PoisonError::into_inner);
        self.accounts.list().iter().map(Account::view).collect()
    }

    /// Empties both repositories.
    pub fn reset(&self) {
        let _guard = self.ledger_lock.write().unwrap_or_else(PoisonError::into_inner);
        self.accounts.clear();
        self.transactions.clear();
        tracing::debug!("Ledger reset");
    }
}
