use std::str::FromStr;

use rusqlite::{params, Connection, Row};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const RECORD_SELECT: &str =
    "SELECT r.id, r.kind, r.patient_id, r.doctor_id, r.examined_at, r.notes, r.illness_id,
            t.id, t.prescribed_medicine, t.duration_days
     FROM medical_records r
     LEFT JOIN treatments t ON t.record_id = r.id";

pub fn insert_regular_record(conn: &Connection, header: &NewRecordHeader) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records (kind, patient_id, doctor_id, examined_at, notes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            RecordKind::Regular.as_str(),
            header.patient_id,
            header.doctor_id,
            format_timestamp(&header.examined_at),
            header.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts the record and its owned treatment. Returns `(record_id, treatment_id)`.
///
/// Two statements: the caller must hold a transaction.
pub fn insert_diagnosis_record(
    conn: &Connection,
    header: &NewRecordHeader,
    illness_id: i64,
    treatment: &NewTreatment,
) -> Result<(i64, i64), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records (kind, patient_id, doctor_id, examined_at, notes, illness_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            RecordKind::Diagnosis.as_str(),
            header.patient_id,
            header.doctor_id,
            format_timestamp(&header.examined_at),
            header.notes,
            illness_id,
        ],
    )?;
    let record_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO treatments (record_id, prescribed_medicine, duration_days) VALUES (?1, ?2, ?3)",
        params![record_id, treatment.prescribed_medicine, treatment.duration_days],
    )?;
    Ok((record_id, conn.last_insert_rowid()))
}

pub fn get_medical_record(conn: &Connection, id: i64) -> Result<Option<MedicalRecord>, DatabaseError> {
    let sql = format!("{RECORD_SELECT} WHERE r.id = ?1");
    let result = conn.query_row(&sql, params![id], read_record_row);

    match result {
        Ok(row) => Ok(Some(record_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_medical_records(conn: &Connection) -> Result<Vec<MedicalRecord>, DatabaseError> {
    search_medical_records(conn, &MedicalRecordFilter::default())
}

/// Records matching the filter, oldest examination first.
pub fn search_medical_records(
    conn: &Connection,
    filter: &MedicalRecordFilter,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let (clause, params_vec) = record_filter_clause(filter);
    let sql = format!("{RECORD_SELECT} WHERE 1=1{clause} ORDER BY r.examined_at, r.id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), read_record_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}

pub fn count_medical_records(conn: &Connection, filter: &MedicalRecordFilter) -> Result<i64, DatabaseError> {
    let (clause, params_vec) = record_filter_clause(filter);
    let sql = format!("SELECT COUNT(*) FROM medical_records r WHERE 1=1{clause}");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let count = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
    Ok(count)
}

fn record_filter_clause(
    filter: &MedicalRecordFilter,
) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut sql = String::new();
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(patient_id) = filter.patient_id {
        sql.push_str(&format!(" AND r.patient_id = ?{param_idx}"));
        params_vec.push(Box::new(patient_id));
        param_idx += 1;
    }
    if let Some(doctor_id) = filter.doctor_id {
        sql.push_str(&format!(" AND r.doctor_id = ?{param_idx}"));
        params_vec.push(Box::new(doctor_id));
        param_idx += 1;
    }
    if let Some(kind) = filter.kind {
        sql.push_str(&format!(" AND r.kind = ?{param_idx}"));
        params_vec.push(Box::new(kind.as_str()));
        param_idx += 1;
    }
    if let Some(illness_id) = filter.illness_id {
        sql.push_str(&format!(" AND r.illness_id = ?{param_idx}"));
        params_vec.push(Box::new(illness_id));
        param_idx += 1;
    }
    let _ = param_idx;

    (sql, params_vec)
}

/// Record with its patient, doctor (and department) and illness.
pub fn get_medical_record_with_details(
    conn: &Connection,
    id: i64,
) -> Result<Option<MedicalRecordDetails>, DatabaseError> {
    let Some(record) = get_medical_record(conn, id)? else {
        return Ok(None);
    };
    let header = record.header();

    let patient = super::get_patient_summary(conn, header.patient_id)?.ok_or_else(|| {
        DatabaseError::NotFound { entity_type: "Patient".into(), id: header.patient_id }
    })?;
    let doctor = super::get_doctor_summary(conn, header.doctor_id)?.ok_or_else(|| {
        DatabaseError::NotFound { entity_type: "Doctor".into(), id: header.doctor_id }
    })?;
    let body = match record {
        MedicalRecord::Regular(r) => RecordDetailsBody::Regular(r),
        MedicalRecord::Diagnosis(d) => {
            let illness = super::get_illness(conn, d.illness_id)?.ok_or_else(|| {
                DatabaseError::NotFound { entity_type: "Illness".into(), id: d.illness_id }
            })?;
            RecordDetailsBody::Diagnosis(d, illness)
        }
    };

    Ok(Some(MedicalRecordDetails { patient, doctor, body }))
}

pub fn get_treatment(conn: &Connection, id: i64) -> Result<Option<Treatment>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, record_id, prescribed_medicine, duration_days FROM treatments WHERE id = ?1",
        params![id],
        |row| {
            Ok(Treatment {
                id: row.get(0)?,
                record_id: row.get(1)?,
                prescribed_medicine: row.get(2)?,
                duration_days: row.get(3)?,
            })
        },
    );

    match result {
        Ok(treatment) => Ok(Some(treatment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Only medicine and duration are mutable; the owning record never changes.
pub fn update_treatment(conn: &Connection, treatment: &Treatment) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE treatments SET prescribed_medicine = ?2, duration_days = ?3 WHERE id = ?1",
        params![
            treatment.id,
            treatment.prescribed_medicine,
            treatment.duration_days,
        ],
    )?;
    Ok(changed == 1)
}

// Internal row type for MedicalRecord mapping
struct RecordRow {
    id: i64,
    kind: String,
    patient_id: i64,
    doctor_id: i64,
    examined_at: String,
    notes: String,
    illness_id: Option<i64>,
    treatment_id: Option<i64>,
    prescribed_medicine: Option<String>,
    duration_days: Option<u32>,
}

fn read_record_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        patient_id: row.get(2)?,
        doctor_id: row.get(3)?,
        examined_at: row.get(4)?,
        notes: row.get(5)?,
        illness_id: row.get(6)?,
        treatment_id: row.get(7)?,
        prescribed_medicine: row.get(8)?,
        duration_days: row.get(9)?,
    })
}

fn record_from_row(row: RecordRow) -> Result<MedicalRecord, DatabaseError> {
    let header = RecordHeader {
        id: row.id,
        patient_id: row.patient_id,
        doctor_id: row.doctor_id,
        examined_at: parse_timestamp(&row.examined_at)?,
        notes: row.notes,
    };

    match RecordKind::from_str(&row.kind)? {
        RecordKind::Regular => Ok(MedicalRecord::Regular(RegularMedicalRecord { header })),
        RecordKind::Diagnosis => {
            let (Some(illness_id), Some(treatment_id), Some(medicine), Some(duration)) = (
                row.illness_id,
                row.treatment_id,
                row.prescribed_medicine,
                row.duration_days,
            ) else {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "diagnosis record {} lacks illness or treatment",
                    row.id
                )));
            };
            Ok(MedicalRecord::Diagnosis(DiagnosisMedicalRecord {
                header,
                illness_id,
                treatment: Treatment {
                    id: treatment_id,
                    record_id: row.id,
                    prescribed_medicine: medicine,
                    duration_days: duration,
                },
            }))
        }
    }
}
