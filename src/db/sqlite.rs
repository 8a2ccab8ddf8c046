use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use super::DatabaseError;

/// Default time a writer waits for the database lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path, busy_timeout_ms: u64) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::MigrationFailed {
                version: 0,
                reason: format!("cannot create {}: {e}", parent.display()),
            })?;
        }
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn, busy_timeout_ms)?;
    run_migrations(&conn)?;
    tracing::debug!(path = %path.display(), "Database opened");
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn, DEFAULT_BUSY_TIMEOUT_MS)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection, busy_timeout_ms: u64) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;"
    )?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
            tx.commit()?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, Option<i64>>(0),
    )
    .ok()
    .flatten()
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + 9 entity/join tables
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 10, "Expected 10 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again, should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn database_opens_from_disk_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hospital.db");
        let conn = open_database(&path, DEFAULT_BUSY_TIMEOUT_MS).unwrap();
        conn.execute("INSERT INTO departments (name) VALUES ('Cardiology')", [])
            .unwrap();
        drop(conn);

        let conn = open_database(&path, DEFAULT_BUSY_TIMEOUT_MS).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM departments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn department_delete_restricted_by_doctor() {
        let conn = open_memory_database().unwrap();
        conn.execute("INSERT INTO departments (name) VALUES ('Cardiology')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO doctors (name, surname, address, phone_number, department_id)
             VALUES ('Stanley', 'Cooper', 'Main St 1', '069245123', 1)",
            [],
        )
        .unwrap();

        let err = conn
            .execute("DELETE FROM departments WHERE id = 1", [])
            .map_err(DatabaseError::from)
            .unwrap_err();
        assert!(err.is_constraint());
    }

    #[test]
    fn record_kind_check_constraint() {
        let conn = open_memory_database().unwrap();
        conn.execute_batch(
            "INSERT INTO departments (name) VALUES ('Cardiology');
             INSERT INTO doctors (name, surname, address, phone_number, department_id)
             VALUES ('Stanley', 'Cooper', 'Main St 1', '069245123', 1);
             INSERT INTO patients (name, surname, age, gender, address)
             VALUES ('Chris', 'Bale', 27, 'M', 'Beverly Hills 256');",
        )
        .unwrap();

        // A diagnosis record without an illness is rejected
        let result = conn.execute(
            "INSERT INTO medical_records (kind, patient_id, doctor_id, examined_at, notes)
             VALUES ('diagnosis', 1, 1, '2024-01-01T00:00:00Z', 'notes')",
            [],
        );
        assert!(result.is_err());
    }
}
