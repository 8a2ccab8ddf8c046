use std::str::FromStr;

use rusqlite::{params, Connection, Row};

use super::contains_pattern;
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const PATIENT_COLUMNS: &str =
    "p.id, p.name, p.surname, p.age, p.gender, p.address, p.phone_number, p.insurance_number, p.version";

pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (name, surname, age, gender, address, phone_number, insurance_number)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.name,
            patient.surname,
            patient.age,
            patient.gender.as_str(),
            patient.address,
            patient.phone_number,
            patient.insurance_number,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE p.id = ?1");
    let result = conn.query_row(&sql, params![id], read_patient_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    search_patients(conn, &PatientFilter::default())
}

pub fn search_patients(
    conn: &Connection,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut sql = format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(ref name) = filter.name {
        sql.push_str(&format!(" AND p.name LIKE ?{param_idx} ESCAPE '\\'"));
        params_vec.push(Box::new(contains_pattern(name)));
        param_idx += 1;
    }
    if let Some(ref surname) = filter.surname {
        sql.push_str(&format!(" AND p.surname LIKE ?{param_idx} ESCAPE '\\'"));
        params_vec.push(Box::new(contains_pattern(surname)));
        param_idx += 1;
    }
    if let Some(gender) = filter.gender {
        sql.push_str(&format!(" AND p.gender = ?{param_idx}"));
        params_vec.push(Box::new(gender.as_str()));
        param_idx += 1;
    }
    if let Some(min) = filter.min_age {
        sql.push_str(&format!(" AND p.age >= ?{param_idx}"));
        params_vec.push(Box::new(min));
        param_idx += 1;
    }
    if let Some(max) = filter.max_age {
        sql.push_str(&format!(" AND p.age <= ?{param_idx}"));
        params_vec.push(Box::new(max));
        param_idx += 1;
    }
    if let Some(doctor_id) = filter.doctor_id {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM doctor_patient_assignments a
                          WHERE a.patient_id = p.id AND a.doctor_id = ?{param_idx})"
        ));
        params_vec.push(Box::new(doctor_id));
        param_idx += 1;
    }
    let _ = param_idx;

    sql.push_str(" ORDER BY p.id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), read_patient_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

/// One page of patients ordered by id. Pages past the end are empty.
pub fn list_patients_page(conn: &Connection, page: Page) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients p ORDER BY p.id LIMIT ?1 OFFSET ?2");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![page.size, page.offset()], read_patient_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

/// Writes demographic fields and bumps the version.
///
/// Only applies when the stored version still equals `patient.version`;
/// returns `false` when the row is missing or was modified in between.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET name = ?2, surname = ?3, age = ?4, gender = ?5, address = ?6,
         phone_number = ?7, insurance_number = ?8, version = version + 1
         WHERE id = ?1 AND version = ?9",
        params![
            patient.id,
            patient.name,
            patient.surname,
            patient.age,
            patient.gender.as_str(),
            patient.address,
            patient.phone_number,
            patient.insurance_number,
            patient.version,
        ],
    )?;
    Ok(changed == 1)
}

/// Bumps the version without touching other fields (used when assignments change).
pub fn touch_patient(conn: &Connection, id: i64, expected_version: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET version = version + 1 WHERE id = ?1 AND version = ?2",
        params![id, expected_version],
    )?;
    Ok(changed == 1)
}

pub fn delete_patient(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    Ok(changed == 1)
}

/// Patient plus every assigned doctor with its department name.
pub fn get_patient_with_doctors(
    conn: &Connection,
    id: i64,
) -> Result<Option<PatientWithDoctors>, DatabaseError> {
    let Some(patient) = get_patient(conn, id)? else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT d.id, d.name, d.surname, dep.name
         FROM doctor_patient_assignments a
         JOIN doctors d ON d.id = a.doctor_id
         JOIN departments dep ON dep.id = d.department_id
         WHERE a.patient_id = ?1
         ORDER BY d.id",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        Ok(DoctorSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            surname: row.get(2)?,
            department_name: row.get(3)?,
        })
    })?;
    let doctors = rows.collect::<Result<Vec<_>, _>>()?;

    Ok(Some(PatientWithDoctors { patient, doctors }))
}

pub fn get_patient_summary(conn: &Connection, id: i64) -> Result<Option<PatientSummary>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, surname FROM patients WHERE id = ?1",
        params![id],
        |row| {
            Ok(PatientSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                surname: row.get(2)?,
            })
        },
    );

    match result {
        Ok(summary) => Ok(Some(summary)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// Internal row type for Patient mapping
struct PatientRow {
    id: i64,
    name: String,
    surname: String,
    age: u8,
    gender: String,
    address: String,
    phone_number: Option<String>,
    insurance_number: Option<String>,
    version: i64,
}

fn read_patient_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
        age: row.get(3)?,
        gender: row.get(4)?,
        address: row.get(5)?,
        phone_number: row.get(6)?,
        insurance_number: row.get(7)?,
        version: row.get(8)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: row.id,
        name: row.name,
        surname: row.surname,
        age: row.age,
        gender: Gender::from_str(&row.gender)?,
        address: row.address,
        phone_number: row.phone_number,
        insurance_number: row.insurance_number,
        version: row.version,
    })
}
