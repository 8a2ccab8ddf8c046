use std::collections::BTreeSet;

use chrono::{NaiveTime, SubsecRound};
use serde::Deserialize;

use super::validation::{
    page, parse_enum, required_text, schedule_hours, work_days, MAX_ADDRESS_LEN,
    MAX_PERSON_NAME_LEN, MAX_PHONE_LEN,
};
use super::{begin, require, AssignmentDiff, CommandError};
use crate::db::repository;
use crate::dto::DoctorDto;
use crate::models::enums::WeekDay;
use crate::models::{
    Assignment, Doctor, DoctorFilter, DoctorSchedule, MedicalRecordFilter, NewDoctor,
};

#[derive(Debug, Clone, Deserialize)]
pub struct EmployNewDoctor {
    pub name: String,
    pub surname: String,
    pub address: String,
    pub phone_number: String,
    pub department_id: i64,
    pub schedule_start: NaiveTime,
    pub schedule_end: NaiveTime,
    pub work_days: Vec<String>,
    #[serde(default)]
    pub patient_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDoctorPersonalInfo {
    pub doctor_id: i64,
    pub name: String,
    pub surname: String,
    pub address: String,
    pub phone_number: String,
    pub department_id: i64,
    pub schedule_start: NaiveTime,
    pub schedule_end: NaiveTime,
    pub work_days: Vec<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Replaces the doctor's full set of patients.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDoctorAssignedPatients {
    pub doctor_id: i64,
    pub patient_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorQuery {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub department_id: Option<i64>,
    pub works_on: Option<String>,
}

struct Personal {
    name: String,
    surname: String,
    address: String,
    phone_number: String,
}

fn validate_personal(
    name: &str,
    surname: &str,
    address: &str,
    phone_number: &str,
) -> Result<Personal, CommandError> {
    Ok(Personal {
        name: required_text("name", name, MAX_PERSON_NAME_LEN)?,
        surname: required_text("surname", surname, MAX_PERSON_NAME_LEN)?,
        address: required_text("address", address, MAX_ADDRESS_LEN)?,
        phone_number: required_text("phone_number", phone_number, MAX_PHONE_LEN)?,
    })
}

fn validate_schedule(
    start: NaiveTime,
    end: NaiveTime,
    days: &[String],
) -> Result<(NaiveTime, NaiveTime, BTreeSet<WeekDay>), CommandError> {
    // Schedules are stored to the second
    let (start, end) = (start.trunc_subsecs(0), end.trunc_subsecs(0));
    schedule_hours(start, end)?;
    let parsed = days
        .iter()
        .map(|d| parse_enum::<WeekDay>("work_days", d))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((start, end, work_days(&parsed)?))
}

fn load(conn: &rusqlite::Connection, id: i64) -> Result<DoctorDto, CommandError> {
    let loaded = require(repository::get_doctor_with_details(conn, id)?, "Doctor", id)?;
    Ok(DoctorDto::from(&loaded))
}

/// Creates the doctor, its schedule and its initial patient assignments
/// in one transaction.
pub fn employ_new_doctor(
    conn: &rusqlite::Connection,
    cmd: &EmployNewDoctor,
) -> Result<DoctorDto, CommandError> {
    let personal = validate_personal(&cmd.name, &cmd.surname, &cmd.address, &cmd.phone_number)?;
    let (start_time, end_time, days) =
        validate_schedule(cmd.schedule_start, cmd.schedule_end, &cmd.work_days)?;

    let tx = begin(conn)?;
    require(repository::get_department(&tx, cmd.department_id)?, "Department", cmd.department_id)?;

    let patient_ids: BTreeSet<i64> = cmd.patient_ids.iter().copied().collect();
    let mut patients = Vec::with_capacity(patient_ids.len());
    for &patient_id in &patient_ids {
        patients.push(require(repository::get_patient(&tx, patient_id)?, "Patient", patient_id)?);
    }

    let doctor_id = repository::insert_doctor(
        &tx,
        &NewDoctor {
            name: personal.name,
            surname: personal.surname,
            address: personal.address,
            phone_number: personal.phone_number,
            department_id: cmd.department_id,
        },
    )?;
    repository::insert_schedule(
        &tx,
        &DoctorSchedule { doctor_id, start_time, end_time, work_days: days },
    )?;
    for patient in &patients {
        repository::insert_assignment(&tx, &Assignment { doctor_id, patient_id: patient.id })?;
        if !repository::touch_patient(&tx, patient.id, patient.version)? {
            return Err(CommandError::stale("Patient", patient.id));
        }
    }
    let dto = load(&tx, doctor_id)?;
    tx.commit()?;

    tracing::info!(
        doctor_id,
        department_id = cmd.department_id,
        patients = patients.len(),
        "Doctor employed"
    );
    Ok(dto)
}

/// Rewrites personal data, department and schedule.
pub fn update_doctor_personal_info(
    conn: &rusqlite::Connection,
    cmd: &UpdateDoctorPersonalInfo,
) -> Result<DoctorDto, CommandError> {
    let personal = validate_personal(&cmd.name, &cmd.surname, &cmd.address, &cmd.phone_number)?;
    let (start_time, end_time, days) =
        validate_schedule(cmd.schedule_start, cmd.schedule_end, &cmd.work_days)?;

    let tx = begin(conn)?;
    let current = require(repository::get_doctor(&tx, cmd.doctor_id)?, "Doctor", cmd.doctor_id)?;
    if cmd.expected_version.is_some_and(|v| v != current.version) {
        tracing::warn!(
            doctor_id = current.id,
            stored = current.version,
            expected = cmd.expected_version,
            "Doctor version mismatch"
        );
        return Err(CommandError::stale("Doctor", current.id));
    }
    require(repository::get_department(&tx, cmd.department_id)?, "Department", cmd.department_id)?;

    let updated = Doctor {
        id: current.id,
        name: personal.name,
        surname: personal.surname,
        address: personal.address,
        phone_number: personal.phone_number,
        department_id: cmd.department_id,
        version: current.version,
    };
    if !repository::update_doctor(&tx, &updated)? {
        return Err(CommandError::stale("Doctor", current.id));
    }

    let schedule = DoctorSchedule { doctor_id: current.id, start_time, end_time, work_days: days };
    if !repository::replace_schedule(&tx, &schedule)? {
        repository::insert_schedule(&tx, &schedule)?;
    }
    let dto = load(&tx, current.id)?;
    tx.commit()?;

    tracing::info!(doctor_id = dto.id, version = dto.version, "Doctor personal info updated");
    Ok(dto)
}

/// Makes `patient_ids` the exact set of the doctor's patients.
pub fn update_doctor_assigned_patients(
    conn: &rusqlite::Connection,
    cmd: &UpdateDoctorAssignedPatients,
) -> Result<DoctorDto, CommandError> {
    let tx = begin(conn)?;
    let doctor = require(repository::get_doctor(&tx, cmd.doctor_id)?, "Doctor", cmd.doctor_id)?;

    let desired: BTreeSet<i64> = cmd.patient_ids.iter().copied().collect();
    for &patient_id in &desired {
        require(repository::get_patient(&tx, patient_id)?, "Patient", patient_id)?;
    }

    let current = repository::get_patient_ids_for_doctor(&tx, doctor.id)?;
    let diff = AssignmentDiff::between(&current, &desired);
    if !diff.is_empty() {
        diff.apply(&tx, |patient_id| Assignment { doctor_id: doctor.id, patient_id })?;

        if !repository::touch_doctor(&tx, doctor.id, doctor.version)? {
            return Err(CommandError::stale("Doctor", doctor.id));
        }
        for patient_id in diff.touched() {
            let patient = require(repository::get_patient(&tx, patient_id)?, "Patient", patient_id)?;
            if !repository::touch_patient(&tx, patient_id, patient.version)? {
                return Err(CommandError::stale("Patient", patient_id));
            }
        }
    }
    let dto = load(&tx, doctor.id)?;
    tx.commit()?;

    tracing::info!(
        doctor_id = doctor.id,
        added = diff.added.len(),
        removed = diff.removed.len(),
        "Doctor patients updated"
    );
    Ok(dto)
}

/// Removes a doctor with no patients and no authored records. The schedule goes with it.
pub fn delete_doctor(conn: &rusqlite::Connection, doctor_id: i64) -> Result<DoctorDto, CommandError> {
    let tx = begin(conn)?;
    let dto = load(&tx, doctor_id)?;

    let records = repository::count_medical_records(
        &tx,
        &MedicalRecordFilter {
            doctor_id: Some(doctor_id),
            ..Default::default()
        },
    )?;
    let mut dependents = Vec::new();
    if !dto.patients.is_empty() {
        dependents.push(format!("{} patient assignment(s)", dto.patients.len()));
    }
    if records > 0 {
        dependents.push(format!("{records} medical record(s)"));
    }
    if !dependents.is_empty() {
        tracing::warn!(doctor_id, records, "Doctor still referenced, delete refused");
        return Err(CommandError::ReferentialIntegrity {
            entity: "Doctor",
            id: doctor_id,
            dependents: dependents.join(", "),
        });
    }

    repository::delete_doctor(&tx, doctor_id)?;
    tx.commit()?;

    tracing::info!(doctor_id, "Doctor deleted");
    Ok(dto)
}

pub fn get_doctor(conn: &rusqlite::Connection, id: i64) -> Result<DoctorDto, CommandError> {
    load(conn, id)
}

/// One page of doctors ordered by id. Pages past the end are empty.
pub fn list_doctors(
    conn: &rusqlite::Connection,
    page_number: u32,
    page_size: u32,
) -> Result<Vec<DoctorDto>, CommandError> {
    let page = page(page_number, page_size)?;
    repository::list_doctors_page(conn, page)?
        .iter()
        .map(|d| load(conn, d.id))
        .collect()
}

pub fn search_doctors(
    conn: &rusqlite::Connection,
    query: &DoctorQuery,
) -> Result<Vec<DoctorDto>, CommandError> {
    let filter = DoctorFilter {
        name: query.name.clone(),
        surname: query.surname.clone(),
        department_id: query.department_id,
        works_on: query.works_on.as_deref().map(|d| parse_enum("works_on", d)).transpose()?,
    };
    repository::search_doctors(conn, &filter)?
        .iter()
        .map(|d| load(conn, d.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    fn hours(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn employment(department_id: i64, patient_ids: Vec<i64>) -> EmployNewDoctor {
        EmployNewDoctor {
            name: "Mike".into(),
            surname: "Denver".into(),
            address: "175 Aroyo Vista, Los Angeles".into(),
            phone_number: "068745123".into(),
            department_id,
            schedule_start: hours(10),
            schedule_end: hours(19),
            work_days: vec!["monday".into(), "sunday".into(), "monday".into()],
            patient_ids,
        }
    }

    fn doctor_rows(conn: &rusqlite::Connection) -> (i64, i64) {
        let doctors = conn.query_row("SELECT COUNT(*) FROM doctors", [], |r| r.get(0)).unwrap();
        let schedules =
            conn.query_row("SELECT COUNT(*) FROM doctor_schedules", [], |r| r.get(0)).unwrap();
        (doctors, schedules)
    }

    #[test]
    fn employ_creates_doctor_schedule_and_assignments() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let p1 = fixtures::patient(&conn, "Chris");
        let p2 = fixtures::patient(&conn, "Walter");

        let dto = employ_new_doctor(&conn, &employment(dep, vec![p2, p1])).unwrap();

        assert_eq!(dto.department.name, "Cardiology");
        let schedule = dto.schedule.as_ref().unwrap();
        assert_eq!(schedule.work_days, vec![WeekDay::Monday, WeekDay::Sunday]);
        assert_eq!(schedule.start_time, hours(10));
        let ids: Vec<i64> = dto.patients.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![p1, p2]);
        assert_eq!(repository::get_patient(&conn, p1).unwrap().unwrap().version, 2);
    }

    #[test]
    fn unknown_department_inserts_nothing() {
        let conn = open_memory_database().unwrap();
        let err = employ_new_doctor(&conn, &employment(77, vec![])).unwrap_err();
        assert!(matches!(err, CommandError::NotFound { entity: "Department", id: 77 }));
        assert_eq!(doctor_rows(&conn), (0, 0));
    }

    #[test]
    fn unknown_initial_patient_inserts_nothing() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let p1 = fixtures::patient(&conn, "Chris");

        let err = employ_new_doctor(&conn, &employment(dep, vec![p1, 555])).unwrap_err();
        assert!(matches!(err, CommandError::NotFound { entity: "Patient", id: 555 }));
        assert_eq!(doctor_rows(&conn), (0, 0));
        assert!(repository::get_all_assignments(&conn).unwrap().is_empty());
    }

    #[test]
    fn employ_validates_schedule() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");

        let mut cmd = employment(dep, vec![]);
        cmd.schedule_start = hours(19);
        cmd.schedule_end = hours(10);
        assert!(matches!(
            employ_new_doctor(&conn, &cmd),
            Err(CommandError::Validation { field: "schedule", .. })
        ));

        let mut cmd = employment(dep, vec![]);
        cmd.work_days = vec![];
        assert!(matches!(
            employ_new_doctor(&conn, &cmd),
            Err(CommandError::Validation { field: "work_days", .. })
        ));

        let mut cmd = employment(dep, vec![]);
        cmd.work_days = vec!["Funday".into()];
        assert!(matches!(
            employ_new_doctor(&conn, &cmd),
            Err(CommandError::Validation { field: "work_days", .. })
        ));
        assert_eq!(doctor_rows(&conn), (0, 0));
    }

    #[test]
    fn schedule_times_drop_fractional_seconds() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");

        let mut cmd = employment(dep, vec![]);
        cmd.schedule_start = NaiveTime::from_hms_milli_opt(9, 0, 0, 100).unwrap();
        cmd.schedule_end = NaiveTime::from_hms_milli_opt(9, 0, 0, 900).unwrap();
        assert!(matches!(
            employ_new_doctor(&conn, &cmd),
            Err(CommandError::Validation { field: "schedule", .. })
        ));
        assert_eq!(doctor_rows(&conn), (0, 0));

        let mut cmd = employment(dep, vec![]);
        cmd.schedule_start = NaiveTime::from_hms_milli_opt(9, 0, 0, 500).unwrap();
        cmd.schedule_end = NaiveTime::from_hms_milli_opt(17, 30, 0, 250).unwrap();
        let dto = employ_new_doctor(&conn, &cmd).unwrap();
        let schedule = dto.schedule.as_ref().unwrap();
        assert_eq!(schedule.start_time, hours(9));
        assert_eq!(schedule.end_time, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
    }

    #[test]
    fn personal_info_update_replaces_schedule() {
        let conn = open_memory_database().unwrap();
        let cardio = fixtures::department(&conn, "Cardiology");
        let neuro = fixtures::department(&conn, "Neurology");
        let dto = employ_new_doctor(&conn, &employment(cardio, vec![])).unwrap();

        let cmd = UpdateDoctorPersonalInfo {
            doctor_id: dto.id,
            name: "Michael".into(),
            surname: dto.surname.clone(),
            address: dto.address.clone(),
            phone_number: dto.phone_number.clone(),
            department_id: neuro,
            schedule_start: hours(8),
            schedule_end: hours(12),
            work_days: vec!["friday".into()],
            expected_version: Some(dto.version),
        };
        let updated = update_doctor_personal_info(&conn, &cmd).unwrap();
        assert_eq!(updated.name, "Michael");
        assert_eq!(updated.department.name, "Neurology");
        assert_eq!(updated.schedule.as_ref().unwrap().work_days, vec![WeekDay::Friday]);
        assert_eq!(updated.version, dto.version + 1);

        let err = update_doctor_personal_info(&conn, &cmd).unwrap_err();
        assert!(matches!(err, CommandError::ConcurrencyConflict(_)));

        let mut cmd = cmd;
        cmd.expected_version = None;
        cmd.department_id = 999;
        assert!(matches!(
            update_doctor_personal_info(&conn, &cmd),
            Err(CommandError::NotFound { entity: "Department", .. })
        ));
        assert_eq!(get_doctor(&conn, dto.id).unwrap().department.id, neuro);
    }

    #[test]
    fn assigned_patients_follow_set_difference() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let doctor = fixtures::doctor(&conn, dep, "Hudson");
        let p1 = fixtures::patient(&conn, "Chris");
        let p2 = fixtures::patient(&conn, "Walter");
        fixtures::assign(&conn, doctor, p1);

        let dto = update_doctor_assigned_patients(
            &conn,
            &UpdateDoctorAssignedPatients { doctor_id: doctor, patient_ids: vec![p2] },
        )
        .unwrap();
        let ids: Vec<i64> = dto.patients.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![p2]);
        assert!(!repository::assignment_exists(&conn, doctor, p1).unwrap());

        let err = update_doctor_assigned_patients(
            &conn,
            &UpdateDoctorAssignedPatients { doctor_id: doctor, patient_ids: vec![p1, 808] },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::NotFound { entity: "Patient", id: 808 }));
        assert!(repository::assignment_exists(&conn, doctor, p2).unwrap());
    }

    #[test]
    fn delete_refuses_doctor_with_patients() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let p1 = fixtures::patient(&conn, "Chris");
        let busy = employ_new_doctor(&conn, &employment(dep, vec![p1])).unwrap();
        let idle = employ_new_doctor(&conn, &employment(dep, vec![])).unwrap();

        assert!(matches!(
            delete_doctor(&conn, busy.id),
            Err(CommandError::ReferentialIntegrity { entity: "Doctor", .. })
        ));

        delete_doctor(&conn, idle.id).unwrap();
        assert_eq!(doctor_rows(&conn), (1, 1));
    }

    #[test]
    fn pages_and_search() {
        let conn = open_memory_database().unwrap();
        let cardio = fixtures::department(&conn, "Cardiology");
        let neuro = fixtures::department(&conn, "Neurology");
        fixtures::doctor(&conn, cardio, "Hudson");
        fixtures::doctor(&conn, neuro, "Kowalski");
        let weekend = employ_new_doctor(&conn, &employment(neuro, vec![])).unwrap();

        assert_eq!(list_doctors(&conn, 1, 2).unwrap().len(), 2);
        assert_eq!(list_doctors(&conn, 2, 2).unwrap()[0].id, weekend.id);
        assert!(list_doctors(&conn, 1, 101).is_err());

        let sunday = search_doctors(
            &conn,
            &DoctorQuery { works_on: Some("sunday".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(sunday.len(), 1);
        assert_eq!(sunday[0].id, weekend.id);

        let neurologists = search_doctors(
            &conn,
            &DoctorQuery { department_id: Some(neuro), ..Default::default() },
        )
        .unwrap();
        assert_eq!(neurologists.len(), 2);
    }
}
