use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::LedgerError;

pub mod write;

use write::ValidationError;

/// Debit/credit polarity of an account or an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Credit => f.write_str("credit"),
            Direction::Debit => f.write_str("debit"),
        }
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            other => Err(ValidationError::UnknownDirection(other.to_string())),
        }
    }
}

/// Strictly positive amount in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::NonPositiveAmount(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One debit or credit line. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountEntry {
    id: Uuid,
    account_id: Uuid,
    direction: Direction,
    amount: Amount,
}

impl AccountEntry {
    pub fn new(id: Option<Uuid>, account_id: Uuid, direction: Direction, amount: Amount) -> Self {
        Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            account_id,
            direction,
            amount,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// Ledger account. Entries are append-only and the balance is always
/// recomputed from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: Uuid,
    name: String,
    direction: Direction,
    entries: Vec<AccountEntry>,
}

impl Account {
    pub fn new(id: Option<Uuid>, name: impl Into<String>, direction: Direction) -> Self {
        Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            name: name.into(),
            direction,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn entries(&self) -> &[AccountEntry] {
        &self.entries
    }

    pub fn entry_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Appends a new entry owned by this account.
    ///
    /// Fails if `id` is already used by one of this account's entries.
    pub fn add_entry(&mut self, direction: Direction, amount: Amount, id: Option<Uuid>) -> Result<&AccountEntry, LedgerError> {
        if let Some(id) = id {
            if self.entries.iter().any(|e| e.id == id) {
                return Err(LedgerError::AccountEntryAlreadyExists(vec![id]));
            }
        }
        self.entries.push(AccountEntry::new(id, self.id, direction, amount));
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn balance(&self) -> i128 {
        self.entries
            .iter()
            .map(|e| {
                let amount = e.amount.value() as i128;
                if e.direction == self.direction { amount } else { -amount }
            })
            .sum()
    }

    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            name: self.name.clone(),
            direction: self.direction,
            balance: self.balance(),
        }
    }
}

/// Read model of an account returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub direction: Direction,
    pub balance: i128,
}

/// A posted set of entries. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: Uuid,
    entries: Vec<AccountEntry>,
}

impl Transaction {
    pub fn new(id: Option<Uuid>, entries: Vec<AccountEntry>) -> Self {
        Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            entries,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entries(&self) -> &[AccountEntry] {
        &self.entries
    }

    /// Returns `(debits, credits)`.
    pub fn totals(&self) -> (i128, i128) {
        self.entries.iter().fold((0, 0), |(debits, credits), e| match e.direction {
            Direction::Debit => (debits + e.amount.value() as i128, credits),
            Direction::Credit => (debits, credits + e.amount.value() as i128),
        })
    }

    pub fn is_balanced(&self) -> bool {
        let (debits, credits) = self.totals();
        debits - credits == 0
    }
}
