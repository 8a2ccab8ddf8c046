//! Validation/command core.
//!
//! One function per business operation, grouped by entity. Every command
//! resolves its references and checks its preconditions inside a single
//! `BEGIN IMMEDIATE` transaction, mutates through the repository layer and
//! commits; any early return drops the transaction and rolls back.
//! Queries read without a transaction and project straight to DTOs.

pub mod departments;
pub mod doctors;
pub mod error;
pub mod illnesses;
pub mod medical_records;
pub mod patients;
pub mod validation;

use std::collections::BTreeSet;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::db::repository::{delete_assignment, insert_assignment};
use crate::models::Assignment;

pub use error::CommandError;

/// Opens the write transaction a command runs in.
///
/// `IMMEDIATE` takes SQLite's write lock up front, so two commands touching
/// the same rows serialize instead of interleaving reads and writes.
pub(crate) fn begin(conn: &Connection) -> Result<Transaction<'_>, CommandError> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

/// Unwraps a lookup or fails with `NotFound` naming the entity.
pub(crate) fn require<T>(found: Option<T>, entity: &'static str, id: i64) -> Result<T, CommandError> {
    found.ok_or_else(|| {
        tracing::warn!(entity, id, "Referenced entity not found");
        CommandError::not_found(entity, id)
    })
}

/// Additions and removals turning `current` into `desired`.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct AssignmentDiff {
    pub added: BTreeSet<i64>,
    pub removed: BTreeSet<i64>,
}

impl AssignmentDiff {
    pub fn between(current: &BTreeSet<i64>, desired: &BTreeSet<i64>) -> Self {
        Self {
            added: desired.difference(current).copied().collect(),
            removed: current.difference(desired).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Every counterpart whose assignments change.
    pub fn touched(&self) -> impl Iterator<Item = i64> + '_ {
        self.added.union(&self.removed).copied()
    }

    /// Writes the diff. `pair` builds the join row for a counterpart id.
    pub fn apply(
        &self,
        conn: &Connection,
        pair: impl Fn(i64) -> Assignment,
    ) -> Result<(), CommandError> {
        for id in &self.removed {
            delete_assignment(conn, &pair(*id))?;
        }
        for id in &self.added {
            insert_assignment(conn, &pair(*id))?;
        }
        Ok(())
    }
}
