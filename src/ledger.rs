use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use ulid::Ulid;

use crate::core::Transaction;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no transaction at position {position}, the ledger holds {len}")]
    OutOfRange { position: usize, len: usize },
    #[error("no transaction with id {0}")]
    NotFound(Ulid),
}

/// A user supplied reference to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Position(usize),
    Id(Ulid),
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(position) = s.parse::<usize>() {
            return Ok(Target::Position(position));
        }

        Ulid::from_string(s)
            .map(Target::Id)
            .map_err(|_| format!("{:?} is neither a position nor a transaction id", s))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Position(p) => write!(f, "position {}", p),
            Target::Id(id) => write!(f, "id {}", id),
        }
    }
}

/// All recorded transactions in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Transaction> {
        self.entries.get(position)
    }

    pub fn append(&mut self, tx: Transaction) -> Ulid {
        let id = tx.id;
        self.entries.push(tx);
        id
    }

    /// Replaces every field of the transaction at `position`. The slot keeps its
    /// id.
    pub fn update(&mut self, position: usize, tx: Transaction) -> Result<(), LedgerError> {
        let len = self.entries.len();
        let slot = self
            .entries
            .get_mut(position)
            .ok_or(LedgerError::OutOfRange { position, len })?;

        *slot = Transaction { id: slot.id, ..tx };

        Ok(())
    }

    /// Removes the transaction at `position`, shifting later ones down.
    pub fn delete(&mut self, position: usize) -> Result<Transaction, LedgerError> {
        if position >= self.entries.len() {
            return Err(LedgerError::OutOfRange {
                position,
                len: self.entries.len(),
            });
        }

        Ok(self.entries.remove(position))
    }

    pub fn position_of(&self, id: Ulid) -> Option<usize> {
        self.entries.iter().position(|tx| tx.id == id)
    }

    pub fn by_id(&self, id: Ulid) -> Option<&Transaction> {
        self.entries.iter().find(|tx| tx.id == id)
    }

    pub fn update_by_id(&mut self, id: Ulid, tx: Transaction) -> Result<(), LedgerError> {
        let position = self.position_of(id).ok_or(LedgerError::NotFound(id))?;
        self.update(position, tx)
    }

    pub fn delete_by_id(&mut self, id: Ulid) -> Result<Transaction, LedgerError> {
        let position = self.position_of(id).ok_or(LedgerError::NotFound(id))?;
        self.delete(position)
    }

    /// Pins a target to the id of the transaction it currently names.
    pub fn resolve(&self, target: Target) -> Result<Ulid, LedgerError> {
        match target {
            Target::Position(position) => self
                .get(position)
                .map(|tx| tx.id)
                .ok_or(LedgerError::OutOfRange {
                    position,
                    len: self.entries.len(),
                }),
            Target::Id(id) => self.by_id(id).map(|tx| tx.id).ok_or(LedgerError::NotFound(id)),
        }
    }
}

impl From<Vec<Transaction>> for Ledger {
    fn from(entries: Vec<Transaction>) -> Self {
        Self { entries }
    }
}

impl FromIterator<Transaction> for Ledger {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
