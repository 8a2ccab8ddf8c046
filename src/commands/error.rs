//! Typed failures surfaced by every command and query.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::enums::RecordKind;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{entity} with id {id} does not exist")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Misassignment: {0}")]
    Misassignment(String),

    #[error("Medical record {id} is not a {expected} record")]
    WrongRecordKind { id: i64, expected: RecordKind },

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Cannot delete {entity} {id}: still referenced by {dependents}")]
    ReferentialIntegrity {
        entity: &'static str,
        id: i64,
        dependents: String,
    },

    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl CommandError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CommandError::NotFound { entity, id }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        CommandError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn stale(entity: &'static str, id: i64) -> Self {
        CommandError::ConcurrencyConflict(format!(
            "{entity} {id} was modified by another operation; reload and retry"
        ))
    }

    /// Stable machine-readable tag for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::NotFound { .. } => "not_found",
            CommandError::Misassignment(_) => "misassignment",
            CommandError::WrongRecordKind { .. } => "wrong_record_kind",
            CommandError::Validation { .. } => "validation",
            CommandError::ReferentialIntegrity { .. } => "referential_integrity",
            CommandError::ConcurrencyConflict(_) => "concurrency_conflict",
            CommandError::Database(_) => "database",
        }
    }
}

impl From<DatabaseError> for CommandError {
    fn from(err: DatabaseError) -> Self {
        if err.is_busy() {
            return CommandError::ConcurrencyConflict(format!(
                "store is locked by another writer: {err}"
            ));
        }
        if err.is_constraint() {
            tracing::warn!(error = %err, "Store rejected write on a constraint");
        }
        CommandError::Database(err)
    }
}

impl From<rusqlite::Error> for CommandError {
    fn from(err: rusqlite::Error) -> Self {
        CommandError::from(DatabaseError::from(err))
    }
}
