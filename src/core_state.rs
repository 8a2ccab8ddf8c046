//! Shared application state: the configuration and the one store connection
//! every command runs against.

use std::sync::Mutex;

use rusqlite::Connection;

use crate::commands::CommandError;
use crate::config::{ConfigError, HospitalConfig};
use crate::db;

/// Owns the injected connection. Commands are serialized on the mutex;
/// writers in other processes serialize on SQLite's own lock.
pub struct CoreState {
    conn: Mutex<Connection>,
    pub config: HospitalConfig,
}

impl CoreState {
    pub fn new(conn: Connection, config: HospitalConfig) -> Self {
        Self {
            conn: Mutex::new(conn),
            config,
        }
    }

    /// Opens (and migrates) the database at `config.db_path`.
    pub fn open(config: HospitalConfig) -> Result<Self, CoreError> {
        let conn = db::sqlite::open_database(&config.db_path, config.busy_timeout_ms)?;
        tracing::info!(path = %config.db_path.display(), "Database opened");
        Ok(Self::new(conn, config))
    }

    /// Runs one command or query with exclusive use of the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, CommandError>,
    ) -> Result<T, CoreError> {
        let conn = self.conn.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(f(&conn)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Command(#[from] CommandError),
}
