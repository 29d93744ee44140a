use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use uuid::Uuid;

use aledger_core::{Account, AccountRepository, LedgerError, TransactionId};

/// Inverse of one mutation, replayed newest first on rollback.
enum Undo {
    Restore(Uuid, Option<Account>),
    ReleaseEntryIds(Vec<Uuid>),
    ReleaseName(String),
    ReclaimName(String),
}

struct UndoLog {
    tx_id: TransactionId,
    ops: Vec<Undo>,
}

#[derive(Default)]
struct AccountState {
    data: HashMap<Uuid, Account>,
    entry_ids: HashSet<Uuid>,
    names: HashSet<String>,
    undo: Option<UndoLog>,
}

impl AccountState {
    fn record(&mut self, op: Undo) {
        if let Some(log) = self.undo.as_mut() {
            log.ops.push(op);
        }
    }

    fn take_log(&mut self, tx_id: TransactionId) -> Result<UndoLog, LedgerError> {
        match self.undo.take() {
            Some(log) if log.tx_id == tx_id => Ok(log),
            other => {
                self.undo = other;
                Err(LedgerError::NoActiveTransaction)
            }
        }
    }

    fn revert(&mut self, ops: Vec<Undo>) {
        for op in ops.into_iter().rev() {
            match op {
                Undo::Restore(id, Some(account)) => {
                    self.data.insert(id, account);
                }
                Undo::Restore(id, None) => {
                    self.data.remove(&id);
                }
                Undo::ReleaseEntryIds(ids) => {
                    for id in ids {
                        self.entry_ids.remove(&id);
                    }
                }
                Undo::ReleaseName(name) => {
                    self.names.remove(&name);
                }
                Undo::ReclaimName(name) => {
                    self.names.insert(name);
                }
            }
        }
    }
}

fn sorted(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort();
    ids
}

pub struct InMemoryAccountRepository {
    state: RwLock<AccountState>,
    tx_counter: AtomicU64,
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(AccountState::default()),
            tx_counter: AtomicU64::new(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AccountState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AccountState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn add(&self, account: &Account) -> Result<(), LedgerError> {
        let mut state = self.write();

        if state.data.contains_key(&account.id()) {
            return Err(LedgerError::AccountAlreadyExists(account.id()));
        }

        let entry_ids: HashSet<Uuid> = account.entry_ids().collect();
        let repeated = sorted(entry_ids.intersection(&state.entry_ids).copied());
        if !repeated.is_empty() {
            return Err(LedgerError::AccountEntryAlreadyExists(repeated));
        }

        if state.names.contains(account.name()) {
            return Err(LedgerError::AccountNameAlreadyExists(account.name().to_string()));
        }

        state.entry_ids.extend(entry_ids.iter().copied());
        state.names.insert(account.name().to_string());
        state.data.insert(account.id(), account.clone());

        state.record(Undo::ReleaseEntryIds(entry_ids.into_iter().collect()));
        state.record(Undo::ReleaseName(account.name().to_string()));
        state.record(Undo::Restore(account.id(), None));
        Ok(())
    }

    fn update(&self, account: &Account) -> Result<(), LedgerError> {
        let mut state = self.write();

        let current = state.data.get(&account.id())
            .ok_or(LedgerError::AccountNotFound(account.id()))?;

        if current.direction() != account.direction() {
            return Err(LedgerError::AccountDirectionChanged(account.id()));
        }
        // Stored entries must survive unchanged and in order; only new ones
        // may follow them.
        if !account.entries().starts_with(current.entries()) {
            return Err(LedgerError::AccountEntriesRewritten(account.id()));
        }

        let new_ids: Vec<Uuid> = account.entries()[current.entries().len()..]
            .iter()
            .map(|entry| entry.id())
            .collect();
        let repeated = sorted(new_ids.iter().copied().filter(|id| state.entry_ids.contains(id)));
        if !repeated.is_empty() {
            return Err(LedgerError::AccountEntryAlreadyExists(repeated));
        }

        let old_name = current.name().to_string();
        if account.name() != old_name {
            if state.names.contains(account.name()) {
                return Err(LedgerError::AccountNameAlreadyExists(account.name().to_string()));
            }
            state.names.remove(&old_name);
            state.names.insert(account.name().to_string());
            state.record(Undo::ReclaimName(old_name));
            state.record(Undo::ReleaseName(account.name().to_string()));
        }

        state.entry_ids.extend(new_ids.iter().copied());
        state.record(Undo::ReleaseEntryIds(new_ids));
        let prior = state.data.insert(account.id(), account.clone());
        state.record(Undo::Restore(account.id(), prior));
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Account, LedgerError> {
        self.read().data.get(&id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound(id))
    }

    fn exists(&self, id: Uuid) -> bool {
        self.read().data.contains_key(&id)
    }

    fn list(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.read().data.values().cloned().collect();
        accounts.sort_by(|a, b| a.name().cmp(b.name()));
        accounts
    }

    fn clear(&self) {
        *self.write() = AccountState::default();
    }

    fn begin_transaction(&self) -> Result<TransactionId, LedgerError> {
        let mut state = self.write();
        if let Some(active) = &state.undo {
            return Err(LedgerError::TransactionInProgress(active.tx_id));
        }
        let tx_id = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        state.undo = Some(UndoLog { tx_id, ops: Vec::new() });
        tracing::debug!(tx_id, "Account transaction started");
        Ok(tx_id)
    }

    fn commit_transaction(&self, tx_id: TransactionId) -> Result<(), LedgerError> {
        self.write().take_log(tx_id)?;
        tracing::debug!(tx_id, "Account transaction committed");
        Ok(())
    }

    fn rollback_transaction(&self, tx_id: TransactionId) -> Result<(), LedgerError> {
        let mut state = self.write();
        let log = state.take_log(tx_id)?;
        let undone = log.ops.len();
        state.revert(log.ops);
        tracing::debug!(tx_id, undone, "Account transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aledger_core::{Amount, Direction};

    use super::*;

    fn account(name: &str) -> Account {
        Account::new(None, name, Direction::Debit)
    }

    fn amount(v: i64) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn test_add_and_get() {
        let repo = InMemoryAccountRepository::new();
        let acc = account("cash");
        repo.add(&acc).unwrap();

        assert!(repo.exists(acc.id()));
        assert_eq!(repo.get(acc.id()).unwrap(), acc);
    }

    #[test]
    fn test_add_rejects_repeated_id() {
        let repo = InMemoryAccountRepository::new();
        let acc = account("cash");
        repo.add(&acc).unwrap();

        let same_id = Account::new(Some(acc.id()), "other", Direction::Credit);
        assert_eq!(repo.add(&same_id), Err(LedgerError::AccountAlreadyExists(acc.id())));
    }

    #[test]
    fn test_add_rejects_repeated_name() {
        let repo = InMemoryAccountRepository::new();
        repo.add(&account("cash")).unwrap();

        assert_eq!(
            repo.add(&account("cash")),
            Err(LedgerError::AccountNameAlreadyExists("cash".to_string()))
        );
        assert_eq!(repo.list().len(), 1);
    }

    #[test]
    fn test_add_rejects_claimed_entry_ids() {
        let repo = InMemoryAccountRepository::new();
        let entry_id = Uuid::new_v4();

        let mut first = account("cash");
        first.add_entry(Direction::Debit, amount(10), Some(entry_id)).unwrap();
        repo.add(&first).unwrap();

        let mut second = account("furniture");
        second.add_entry(Direction::Debit, amount(10), Some(entry_id)).unwrap();
        assert_eq!(repo.add(&second), Err(LedgerError::AccountEntryAlreadyExists(vec![entry_id])));
        assert!(!repo.exists(second.id()));
    }

    #[test]
    fn test_get_returns_detached_copy() {
        let repo = InMemoryAccountRepository::new();
        let acc = account("cash");
        repo.add(&acc).unwrap();

        let mut copy = repo.get(acc.id()).unwrap();
        copy.add_entry(Direction::Debit, amount(100), None).unwrap();

        let stored = repo.get(acc.id()).unwrap();
        assert!(stored.entries().is_empty());
        assert_eq!(stored.balance(), 0);
    }

    #[test]
    fn test_get_unknown_account() {
        let repo = InMemoryAccountRepository::new();
        let id = Uuid::new_v4();
        assert_eq!(repo.get(id), Err(LedgerError::AccountNotFound(id)));
        assert!(!repo.exists(id));
    }

    #[test]
    fn test_update_appends_entries() {
        let repo = InMemoryAccountRepository::new();
        let acc = account("cash");
        repo.add(&acc).unwrap();

        let mut copy = repo.get(acc.id()).unwrap();
        copy.add_entry(Direction::Debit, amount(100), None).unwrap();
        repo.update(&copy).unwrap();
        // Re-saving the same version only carries already-registered ids.
        repo.update(&copy).unwrap();

        assert_eq!(repo.get(acc.id()).unwrap().balance(), 100);
    }

    #[test]
    fn test_update_rejects_entry_claimed_by_other_account() {
        let repo = InMemoryAccountRepository::new();
        let entry_id = Uuid::new_v4();

        let mut cash = account("cash");
        cash.add_entry(Direction::Debit, amount(10), Some(entry_id)).unwrap();
        repo.add(&cash).unwrap();

        let furniture = account("furniture");
        repo.add(&furniture).unwrap();

        let mut copy = repo.get(furniture.id()).unwrap();
        copy.add_entry(Direction::Debit, amount(10), Some(entry_id)).unwrap();
        assert_eq!(repo.update(&copy), Err(LedgerError::AccountEntryAlreadyExists(vec![entry_id])));
        assert!(repo.get(furniture.id()).unwrap().entries().is_empty());
    }

    #[test]
    fn test_update_unknown_account() {
        let repo = InMemoryAccountRepository::new();
        let acc = account("cash");
        assert_eq!(repo.update(&acc), Err(LedgerError::AccountNotFound(acc.id())));
    }

    #[test]
    fn test_update_rename() {
        let repo = InMemoryAccountRepository::new();
        let cash = account("cash");
        repo.add(&cash).unwrap();
        repo.add(&account("furniture")).unwrap();

        let taken = Account::new(Some(cash.id()), "furniture", Direction::Debit);
        assert_eq!(
            repo.update(&taken),
            Err(LedgerError::AccountNameAlreadyExists("furniture".to_string()))
        );

        let renamed = Account::new(Some(cash.id()), "petty-cash", Direction::Debit);
        repo.update(&renamed).unwrap();
        assert_eq!(repo.get(cash.id()).unwrap().name(), "petty-cash");

        // The released name can be claimed again.
        repo.add(&account("cash")).unwrap();
    }

    #[test]
    fn test_update_rejects_direction_change() {
        let repo = InMemoryAccountRepository::new();
        let mut cash = account("cash");
        cash.add_entry(Direction::Debit, amount(100), None).unwrap();
        repo.add(&cash).unwrap();

        let flipped = Account::new(Some(cash.id()), "cash", Direction::Credit);
        assert_eq!(repo.update(&flipped), Err(LedgerError::AccountDirectionChanged(cash.id())));

        let stored = repo.get(cash.id()).unwrap();
        assert_eq!(stored.direction(), Direction::Debit);
        assert_eq!(stored.entries().len(), 1);
        assert_eq!(stored.balance(), 100);
    }

    #[test]
    fn test_update_rejects_removed_entries() {
        let repo = InMemoryAccountRepository::new();
        let mut cash = account("cash");
        cash.add_entry(Direction::Debit, amount(100), None).unwrap();
        repo.add(&cash).unwrap();

        let emptied = Account::new(Some(cash.id()), "cash", Direction::Debit);
        assert_eq!(repo.update(&emptied), Err(LedgerError::AccountEntriesRewritten(cash.id())));

        // Same length, different entry in place of the stored one.
        let mut replaced = Account::new(Some(cash.id()), "cash", Direction::Debit);
        replaced.add_entry(Direction::Credit, amount(100), None).unwrap();
        assert_eq!(repo.update(&replaced), Err(LedgerError::AccountEntriesRewritten(cash.id())));

        assert_eq!(repo.get(cash.id()).unwrap(), cash);
    }

    #[test]
    fn test_update_keeps_prefix_and_appends() {
        let repo = InMemoryAccountRepository::new();
        let mut cash = account("cash");
        cash.add_entry(Direction::Debit, amount(100), None).unwrap();
        repo.add(&cash).unwrap();

        let mut copy = repo.get(cash.id()).unwrap();
        copy.add_entry(Direction::Credit, amount(30), None).unwrap();
        repo.update(&copy).unwrap();

        let stored = repo.get(cash.id()).unwrap();
        assert_eq!(stored.entries()[0], cash.entries()[0]);
        assert_eq!(stored.balance(), 70);
    }

    #[test]
    fn test_rollback_undoes_changes() {
        let repo = InMemoryAccountRepository::new();
        let acc = account("cash");
        repo.add(&acc).unwrap();

        let tx_id = repo.begin_transaction().unwrap();
        let mut copy = repo.get(acc.id()).unwrap();
        copy.add_entry(Direction::Debit, amount(100), None).unwrap();
        repo.update(&copy).unwrap();
        repo.add(&account("furniture")).unwrap();
        repo.rollback_transaction(tx_id).unwrap();

        assert_eq!(repo.get(acc.id()).unwrap().balance(), 0);
        assert_eq!(repo.list().len(), 1);
        // Entry ids claimed inside the rolled back transaction are free again.
        let mut retry = repo.get(acc.id()).unwrap();
        retry.add_entry(Direction::Debit, amount(100), Some(copy.entries()[0].id())).unwrap();
        repo.update(&retry).unwrap();
    }

    #[test]
    fn test_rollback_restores_names() {
        let repo = InMemoryAccountRepository::new();
        let cash = account("cash");
        repo.add(&cash).unwrap();

        let tx_id = repo.begin_transaction().unwrap();
        repo.update(&Account::new(Some(cash.id()), "petty-cash", Direction::Debit)).unwrap();
        repo.rollback_transaction(tx_id).unwrap();

        assert_eq!(repo.get(cash.id()).unwrap().name(), "cash");
        assert_eq!(
            repo.add(&account("cash")),
            Err(LedgerError::AccountNameAlreadyExists("cash".to_string()))
        );
        repo.add(&account("petty-cash")).unwrap();
    }

    #[test]
    fn test_rollback_keeps_earlier_commits() {
        let repo = InMemoryAccountRepository::new();
        let cash = account("cash");
        repo.add(&cash).unwrap();

        let tx_id = repo.begin_transaction().unwrap();
        let mut first = repo.get(cash.id()).unwrap();
        first.add_entry(Direction::Debit, amount(100), None).unwrap();
        repo.update(&first).unwrap();
        repo.commit_transaction(tx_id).unwrap();

        let tx_id = repo.begin_transaction().unwrap();
        let mut second = repo.get(cash.id()).unwrap();
        second.add_entry(Direction::Debit, amount(50), None).unwrap();
        second.add_entry(Direction::Debit, amount(25), None).unwrap();
        repo.update(&second).unwrap();
        repo.rollback_transaction(tx_id).unwrap();

        assert_eq!(repo.get(cash.id()).unwrap(), first);
    }

    #[test]
    fn test_one_transaction_at_a_time() {
        let repo = InMemoryAccountRepository::new();
        let tx_id = repo.begin_transaction().unwrap();
        assert_eq!(repo.begin_transaction(), Err(LedgerError::TransactionInProgress(tx_id)));
        assert_eq!(repo.commit_transaction(tx_id + 1), Err(LedgerError::NoActiveTransaction));

        repo.commit_transaction(tx_id).unwrap();
        assert!(repo.begin_transaction().unwrap() > tx_id);
    }

    #[test]
    fn test_commit_keeps_changes() {
        let repo = InMemoryAccountRepository::new();
        let tx_id = repo.begin_transaction().unwrap();
        repo.add(&account("cash")).unwrap();
        repo.commit_transaction(tx_id).unwrap();

        assert_eq!(repo.list().len(), 1);
        assert_eq!(repo.commit_transaction(tx_id), Err(LedgerError::NoActiveTransaction));
        assert_eq!(repo.rollback_transaction(tx_id), Err(LedgerError::NoActiveTransaction));
    }

    #[test]
    fn test_list_is_ordered_by_name() {
        let repo = InMemoryAccountRepository::new();
        repo.add(&account("petty-cash")).unwrap();
        repo.add(&account("furniture")).unwrap();
        repo.add(&account("bank-loan")).unwrap();

        let names: Vec<String> = repo.list().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["bank-loan", "furniture", "petty-cash"]);
    }

    #[test]
    fn test_clear() {
        let repo = InMemoryAccountRepository::new();
        let acc = account("cash");
        repo.add(&acc).unwrap();
        repo.clear();

        assert!(!repo.exists(acc.id()));
        repo.add(&acc).unwrap();
    }
}
