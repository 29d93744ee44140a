use thiserror::Error;
use uuid::Uuid;

use super::{AccountEntry, Amount, Direction};

pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 35;

/// Field-level rejection raised while building a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must be between {min} and {max} characters, got {len}")]
    NameLength { len: usize, min: usize, max: usize },
    #[error("amount must be a positive integer, got {0}")]
    NonPositiveAmount(i64),
    #[error("unknown direction: {0}")]
    UnknownDirection(String),
    #[error("malformed {field}: {value}")]
    MalformedId { field: &'static str, value: String },
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("transaction must have at least one entry")]
    NoEntries,
}

pub fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::MalformedId {
        field,
        value: raw.to_string(),
    })
}

fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::NameLength { len, min: NAME_MIN_LEN, max: NAME_MAX_LEN });
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterAccountCommand {
    id: Option<Uuid>,
    name: String,
    direction: Direction,
}

impl RegisterAccountCommand {
    pub fn new(id: Option<Uuid>, name: &str, direction: Direction) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            name: validate_name(name)?,
            direction,
        })
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryCommand {
    pub id: Option<Uuid>,
    pub account_id: Uuid,
    pub direction: Direction,
    pub amount: Amount,
}

impl EntryCommand {
    pub fn new(id: Option<Uuid>, account_id: Uuid, direction: Direction, amount: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            account_id,
            direction,
            amount: Amount::new(amount)?,
        })
    }

    /// Materialises the entry, generating an id if none was supplied.
    pub fn to_entry(&self) -> AccountEntry {
        AccountEntry::new(self.id, self.account_id, self.direction, self.amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostTransactionCommand {
    id: Option<Uuid>,
    entries: Vec<EntryCommand>,
}

impl PostTransactionCommand {
    /// Builds a posting command.
    ///
    /// An empty entry list is rejected with [`ValidationError::NoEntries`].
    /// With no entries both totals are zero, so the balance check alone would
    /// accept it and record a transaction that moves nothing.
    pub fn new(id: Option<Uuid>, entries: Vec<EntryCommand>) -> Result<Self, ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::NoEntries);
        }
        Ok(Self { id, entries })
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn entries(&self) -> &[EntryCommand] {
        &self.entries
    }
}
