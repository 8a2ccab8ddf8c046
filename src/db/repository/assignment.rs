use std::collections::BTreeSet;

use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::*;

/// Inserts the pair. Re-inserting an existing pair is a no-op.
pub fn insert_assignment(conn: &Connection, assignment: &Assignment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO doctor_patient_assignments (doctor_id, patient_id) VALUES (?1, ?2)",
        params![assignment.doctor_id, assignment.patient_id],
    )?;
    Ok(())
}

pub fn delete_assignment(conn: &Connection, assignment: &Assignment) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM doctor_patient_assignments WHERE doctor_id = ?1 AND patient_id = ?2",
        params![assignment.doctor_id, assignment.patient_id],
    )?;
    Ok(changed == 1)
}

pub fn assignment_exists(conn: &Connection, doctor_id: i64, patient_id: i64) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM doctor_patient_assignments
                        WHERE doctor_id = ?1 AND patient_id = ?2)",
        params![doctor_id, patient_id],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

pub fn get_all_assignments(conn: &Connection) -> Result<Vec<Assignment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT doctor_id, patient_id FROM doctor_patient_assignments ORDER BY doctor_id, patient_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Assignment {
            doctor_id: row.get(0)?,
            patient_id: row.get(1)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn get_doctor_ids_for_patient(conn: &Connection, patient_id: i64) -> Result<BTreeSet<i64>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT doctor_id FROM doctor_patient_assignments WHERE patient_id = ?1")?;
    let rows = stmt.query_map(params![patient_id], |row| row.get::<_, i64>(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn get_patient_ids_for_doctor(conn: &Connection, doctor_id: i64) -> Result<BTreeSet<i64>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT patient_id FROM doctor_patient_assignments WHERE doctor_id = ?1")?;
    let rows = stmt.query_map(params![doctor_id], |row| row.get::<_, i64>(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
