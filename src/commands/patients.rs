use std::collections::BTreeSet;

use serde::Deserialize;

use super::validation::{
    age, optional_text, page, parse_enum, required_text, MAX_ADDRESS_LEN, MAX_INSURANCE_LEN,
    MAX_PERSON_NAME_LEN, MAX_PHONE_LEN,
};
use super::{begin, require, AssignmentDiff, CommandError};
use crate::db::repository;
use crate::dto::PatientDto;
use crate::models::enums::Gender;
use crate::models::{Assignment, MedicalRecordFilter, NewPatient, Patient, PatientFilter};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterNewPatient {
    pub name: String,
    pub surname: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub insurance_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePatientDetails {
    pub patient_id: i64,
    pub name: String,
    pub surname: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub insurance_number: Option<String>,
    /// When set, the update only applies to this version of the patient.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Replaces the patient's full set of doctors.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePatientAssignedDoctors {
    pub patient_id: i64,
    pub doctor_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientQuery {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub gender: Option<String>,
    pub min_age: Option<i64>,
    pub max_age: Option<i64>,
    pub doctor_id: Option<i64>,
}

/// Demographic fields after validation.
struct Demographics {
    name: String,
    surname: String,
    age: u8,
    gender: Gender,
    address: String,
    phone_number: Option<String>,
    insurance_number: Option<String>,
}

fn validate_demographics(
    name: &str,
    surname: &str,
    years: i64,
    gender: &str,
    address: &str,
    phone_number: Option<&str>,
    insurance_number: Option<&str>,
) -> Result<Demographics, CommandError> {
    Ok(Demographics {
        name: required_text("name", name, MAX_PERSON_NAME_LEN)?,
        surname: required_text("surname", surname, MAX_PERSON_NAME_LEN)?,
        age: age(years)?,
        gender: parse_enum("gender", gender)?,
        address: required_text("address", address, MAX_ADDRESS_LEN)?,
        phone_number: optional_text("phone_number", phone_number, MAX_PHONE_LEN)?,
        insurance_number: optional_text("insurance_number", insurance_number, MAX_INSURANCE_LEN)?,
    })
}

fn load(conn: &rusqlite::Connection, id: i64) -> Result<PatientDto, CommandError> {
    let loaded = require(repository::get_patient_with_doctors(conn, id)?, "Patient", id)?;
    Ok(PatientDto::from(&loaded))
}

pub fn register_new_patient(
    conn: &rusqlite::Connection,
    cmd: &RegisterNewPatient,
) -> Result<PatientDto, CommandError> {
    let fields = validate_demographics(
        &cmd.name,
        &cmd.surname,
        cmd.age,
        &cmd.gender,
        &cmd.address,
        cmd.phone_number.as_deref(),
        cmd.insurance_number.as_deref(),
    )?;

    let tx = begin(conn)?;
    let id = repository::insert_patient(
        &tx,
        &NewPatient {
            name: fields.name,
            surname: fields.surname,
            age: fields.age,
            gender: fields.gender,
            address: fields.address,
            phone_number: fields.phone_number,
            insurance_number: fields.insurance_number,
        },
    )?;
    let dto = load(&tx, id)?;
    tx.commit()?;

    tracing::info!(patient_id = id, "Patient registered");
    Ok(dto)
}

pub fn update_patient_details(
    conn: &rusqlite::Connection,
    cmd: &UpdatePatientDetails,
) -> Result<PatientDto, CommandError> {
    let fields = validate_demographics(
        &cmd.name,
        &cmd.surname,
        cmd.age,
        &cmd.gender,
        &cmd.address,
        cmd.phone_number.as_deref(),
        cmd.insurance_number.as_deref(),
    )?;

    let tx = begin(conn)?;
    let current = require(repository::get_patient(&tx, cmd.patient_id)?, "Patient", cmd.patient_id)?;
    if cmd.expected_version.is_some_and(|v| v != current.version) {
        tracing::warn!(
            patient_id = current.id,
            stored = current.version,
            expected = cmd.expected_version,
            "Patient version mismatch"
        );
        return Err(CommandError::stale("Patient", current.id));
    }

    let updated = Patient {
        id: current.id,
        name: fields.name,
        surname: fields.surname,
        age: fields.age,
        gender: fields.gender,
        address: fields.address,
        phone_number: fields.phone_number,
        insurance_number: fields.insurance_number,
        version: current.version,
    };
    if !repository::update_patient(&tx, &updated)? {
        return Err(CommandError::stale("Patient", current.id));
    }
    let dto = load(&tx, current.id)?;
    tx.commit()?;

    tracing::info!(patient_id = dto.id, version = dto.version, "Patient details updated");
    Ok(dto)
}

/// Makes `doctor_ids` the exact set of the patient's doctors.
///
/// Every id must resolve before anything is written; an empty list removes
/// all assignments.
pub fn update_patient_assigned_doctors(
    conn: &rusqlite::Connection,
    cmd: &UpdatePatientAssignedDoctors,
) -> Result<PatientDto, CommandError> {
    let tx = begin(conn)?;
    let patient = require(repository::get_patient(&tx, cmd.patient_id)?, "Patient", cmd.patient_id)?;

    let desired: BTreeSet<i64> = cmd.doctor_ids.iter().copied().collect();
    for &doctor_id in &desired {
        require(repository::get_doctor(&tx, doctor_id)?, "Doctor", doctor_id)?;
    }

    let current = repository::get_doctor_ids_for_patient(&tx, patient.id)?;
    let diff = AssignmentDiff::between(&current, &desired);
    if !diff.is_empty() {
        diff.apply(&tx, |doctor_id| Assignment { doctor_id, patient_id: patient.id })?;

        if !repository::touch_patient(&tx, patient.id, patient.version)? {
            return Err(CommandError::stale("Patient", patient.id));
        }
        for doctor_id in diff.touched() {
            let doctor = require(repository::get_doctor(&tx, doctor_id)?, "Doctor", doctor_id)?;
            if !repository::touch_doctor(&tx, doctor_id, doctor.version)? {
                return Err(CommandError::stale("Doctor", doctor_id));
            }
        }
    }
    let dto = load(&tx, patient.id)?;
    tx.commit()?;

    tracing::info!(
        patient_id = patient.id,
        added = diff.added.len(),
        removed = diff.removed.len(),
        "Patient doctors updated"
    );
    Ok(dto)
}

/// Removes a patient with no doctors and no medical history.
pub fn delete_patient(conn: &rusqlite::Connection, patient_id: i64) -> Result<PatientDto, CommandError> {
    let tx = begin(conn)?;
    let dto = load(&tx, patient_id)?;

    let records = repository::count_medical_records(
        &tx,
        &MedicalRecordFilter {
            patient_id: Some(patient_id),
            ..Default::default()
        },
    )?;
    let mut dependents = Vec::new();
    if !dto.doctors.is_empty() {
        dependents.push(format!("{} doctor assignment(s)", dto.doctors.len()));
    }
    if records > 0 {
        dependents.push(format!("{records} medical record(s)"));
    }
    if !dependents.is_empty() {
        tracing::warn!(patient_id, records, "Patient still referenced, delete refused");
        return Err(CommandError::ReferentialIntegrity {
            entity: "Patient",
            id: patient_id,
            dependents: dependents.join(", "),
        });
    }

    repository::delete_patient(&tx, patient_id)?;
    tx.commit()?;

    tracing::info!(patient_id, "Patient deleted");
    Ok(dto)
}

pub fn get_patient(conn: &rusqlite::Connection, id: i64) -> Result<PatientDto, CommandError> {
    load(conn, id)
}

/// One page of patients ordered by id. Pages past the end are empty.
pub fn list_patients(
    conn: &rusqlite::Connection,
    page_number: u32,
    page_size: u32,
) -> Result<Vec<PatientDto>, CommandError> {
    let page = page(page_number, page_size)?;
    repository::list_patients_page(conn, page)?
        .iter()
        .map(|p| load(conn, p.id))
        .collect()
}

pub fn search_patients(
    conn: &rusqlite::Connection,
    query: &PatientQuery,
) -> Result<Vec<PatientDto>, CommandError> {
    let filter = PatientFilter {
        name: query.name.clone(),
        surname: query.surname.clone(),
        gender: query.gender.as_deref().map(|g| parse_enum("gender", g)).transpose()?,
        min_age: query.min_age.map(age).transpose()?,
        max_age: query.max_age.map(age).transpose()?,
        doctor_id: query.doctor_id,
    };
    repository::search_patients(conn, &filter)?
        .iter()
        .map(|p| load(conn, p.id))
        .collect()
}
