//! Examination records. A record can only be written by one of the patient's
//! assigned doctors and, once stored, only a diagnosis' treatment may change.

use chrono::{SubsecRound, Utc};
use serde::Deserialize;

use super::validation::{required_text, treatment_duration, MAX_MEDICINE_LEN, MAX_NOTES_LEN};
use super::{begin, require, CommandError};
use crate::db::repository;
use crate::dto::{MedicalRecordDto, TreatmentDto};
use crate::models::enums::RecordKind;
use crate::models::{MedicalRecord, MedicalRecordFilter, NewRecordHeader, NewTreatment};

#[derive(Debug, Clone, Deserialize)]
pub struct AddNewRegularMedicalRecord {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddNewDiagnosisMedicalRecord {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub notes: String,
    pub illness_id: i64,
    pub prescribed_medicine: String,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustTreatmentDetailsWithinDiagnosisMedicalRecord {
    pub record_id: i64,
    pub doctor_id: i64,
    pub prescribed_medicine: String,
    pub duration_days: i64,
}

/// Resolves patient, then doctor.
fn resolve_examination(
    conn: &rusqlite::Connection,
    patient_id: i64,
    doctor_id: i64,
) -> Result<(), CommandError> {
    require(repository::get_patient(conn, patient_id)?, "Patient", patient_id)?;
    require(repository::get_doctor(conn, doctor_id)?, "Doctor", doctor_id)?;
    Ok(())
}

fn check_assignment(
    conn: &rusqlite::Connection,
    patient_id: i64,
    doctor_id: i64,
) -> Result<(), CommandError> {
    if !repository::assignment_exists(conn, doctor_id, patient_id)? {
        tracing::warn!(patient_id, doctor_id, "Doctor is not assigned to patient");
        return Err(CommandError::Misassignment(format!(
            "doctor {doctor_id} is not assigned to patient {patient_id}"
        )));
    }
    Ok(())
}

fn load(conn: &rusqlite::Connection, id: i64) -> Result<MedicalRecordDto, CommandError> {
    let loaded = require(
        repository::get_medical_record_with_details(conn, id)?,
        "MedicalRecord",
        id,
    )?;
    Ok(MedicalRecordDto::from(&loaded))
}

fn examination_header(patient_id: i64, doctor_id: i64, notes: String) -> NewRecordHeader {
    NewRecordHeader {
        patient_id,
        doctor_id,
        // Stored timestamps keep microsecond precision
        examined_at: Utc::now().trunc_subsecs(6),
        notes,
    }
}

pub fn add_new_regular_medical_record(
    conn: &rusqlite::Connection,
    cmd: &AddNewRegularMedicalRecord,
) -> Result<MedicalRecordDto, CommandError> {
    let tx = begin(conn)?;
    resolve_examination(&tx, cmd.patient_id, cmd.doctor_id)?;
    let notes = required_text("notes", &cmd.notes, MAX_NOTES_LEN)?;
    check_assignment(&tx, cmd.patient_id, cmd.doctor_id)?;

    let header = examination_header(cmd.patient_id, cmd.doctor_id, notes);
    let record_id = repository::insert_regular_record(&tx, &header)?;
    let dto = load(&tx, record_id)?;
    tx.commit()?;

    tracing::info!(
        record_id,
        patient_id = cmd.patient_id,
        doctor_id = cmd.doctor_id,
        "Regular medical record added"
    );
    Ok(dto)
}

pub fn add_new_diagnosis_medical_record(
    conn: &rusqlite::Connection,
    cmd: &AddNewDiagnosisMedicalRecord,
) -> Result<MedicalRecordDto, CommandError> {
    let tx = begin(conn)?;
    resolve_examination(&tx, cmd.patient_id, cmd.doctor_id)?;
    require(repository::get_illness(&tx, cmd.illness_id)?, "Illness", cmd.illness_id)?;

    let notes = required_text("notes", &cmd.notes, MAX_NOTES_LEN)?;
    let treatment = NewTreatment {
        prescribed_medicine: required_text(
            "prescribed_medicine",
            &cmd.prescribed_medicine,
            MAX_MEDICINE_LEN,
        )?,
        duration_days: treatment_duration(cmd.duration_days)?,
    };
    check_assignment(&tx, cmd.patient_id, cmd.doctor_id)?;

    let header = examination_header(cmd.patient_id, cmd.doctor_id, notes);
    let (record_id, treatment_id) =
        repository::insert_diagnosis_record(&tx, &header, cmd.illness_id, &treatment)?;
    let dto = load(&tx, record_id)?;
    tx.commit()?;

    tracing::info!(
        record_id,
        treatment_id,
        patient_id = cmd.patient_id,
        doctor_id = cmd.doctor_id,
        illness_id = cmd.illness_id,
        "Diagnosis medical record added"
    );
    Ok(dto)
}

/// Changes medicine and duration of a diagnosis' treatment.
///
/// Only the doctor responsible for the record may adjust it.
pub fn adjust_treatment_details_within_diagnosis_medical_record(
    conn: &rusqlite::Connection,
    cmd: &AdjustTreatmentDetailsWithinDiagnosisMedicalRecord,
) -> Result<MedicalRecordDto, CommandError> {
    let tx = begin(conn)?;
    let record = require(
        repository::get_medical_record(&tx, cmd.record_id)?,
        "MedicalRecord",
        cmd.record_id,
    )?;
    let MedicalRecord::Diagnosis(diagnosis) = record else {
        tracing::warn!(record_id = cmd.record_id, "Treatment adjustment on a regular record");
        return Err(CommandError::WrongRecordKind {
            id: cmd.record_id,
            expected: RecordKind::Diagnosis,
        });
    };
    if diagnosis.header.doctor_id != cmd.doctor_id {
        tracing::warn!(
            record_id = cmd.record_id,
            doctor_id = cmd.doctor_id,
            responsible = diagnosis.header.doctor_id,
            "Treatment adjustment by a different doctor"
        );
        return Err(CommandError::Misassignment(format!(
            "doctor {} is not responsible for medical record {}",
            cmd.doctor_id, cmd.record_id
        )));
    }

    let mut treatment = diagnosis.treatment;
    treatment.prescribed_medicine = required_text(
        "prescribed_medicine",
        &cmd.prescribed_medicine,
        MAX_MEDICINE_LEN,
    )?;
    treatment.duration_days = treatment_duration(cmd.duration_days)?;
    if !repository::update_treatment(&tx, &treatment)? {
        return Err(CommandError::not_found("Treatment", treatment.id));
    }
    let dto = load(&tx, cmd.record_id)?;
    tx.commit()?;

    tracing::info!(
        record_id = cmd.record_id,
        treatment_id = treatment.id,
        duration_days = treatment.duration_days,
        "Treatment adjusted"
    );
    Ok(dto)
}

pub fn get_medical_record(conn: &rusqlite::Connection, id: i64) -> Result<MedicalRecordDto, CommandError> {
    load(conn, id)
}

/// A patient's history, oldest examination first.
pub fn list_patient_medical_records(
    conn: &rusqlite::Connection,
    patient_id: i64,
) -> Result<Vec<MedicalRecordDto>, CommandError> {
    require(repository::get_patient(conn, patient_id)?, "Patient", patient_id)?;
    let filter = MedicalRecordFilter {
        patient_id: Some(patient_id),
        ..Default::default()
    };
    repository::search_medical_records(conn, &filter)?
        .iter()
        .map(|r| load(conn, r.header().id))
        .collect()
}

pub fn get_treatment(conn: &rusqlite::Connection, id: i64) -> Result<TreatmentDto, CommandError> {
    let treatment = require(repository::get_treatment(conn, id)?, "Treatment", id)?;
    Ok(TreatmentDto::from(&treatment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    struct Ward {
        conn: rusqlite::Connection,
        doctor: i64,
        other_doctor: i64,
        patient: i64,
        illness: i64,
    }

    /// One patient assigned to `doctor` only.
    fn ward() -> Ward {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let doctor = fixtures::doctor(&conn, dep, "Hudson");
        let other_doctor = fixtures::doctor(&conn, dep, "Kowalski");
        let patient = fixtures::patient(&conn, "Chris");
        let illness = fixtures::illness(&conn, "Arrhythmia");
        fixtures::assign(&conn, doctor, patient);
        Ward { conn, doctor, other_doctor, patient, illness }
    }

    fn diagnosis(w: &Ward, doctor_id: i64) -> AddNewDiagnosisMedicalRecord {
        AddNewDiagnosisMedicalRecord {
            patient_id: w.patient,
            doctor_id,
            notes: "Irregular pulse".into(),
            illness_id: w.illness,
            prescribed_medicine: "Valocordin".into(),
            duration_days: 5,
        }
    }

    fn record_count(conn: &rusqlite::Connection) -> i64 {
        repository::count_medical_records(conn, &MedicalRecordFilter::default()).unwrap()
    }

    #[test]
    fn assigned_doctor_adds_regular_record() {
        let w = ward();
        let dto = add_new_regular_medical_record(
            &w.conn,
            &AddNewRegularMedicalRecord {
                patient_id: w.patient,
                doctor_id: w.doctor,
                notes: "Routine check".into(),
            },
        )
        .unwrap();

        let MedicalRecordDto::Regular(record) = &dto else {
            panic!("expected a regular record, got {dto:?}");
        };
        assert_eq!(record.examined_patient.id, w.patient);
        assert_eq!(record.responsible_doctor.id, w.doctor);
        assert_eq!(record.responsible_doctor.department, "Cardiology");
        assert_eq!(get_medical_record(&w.conn, dto.id()).unwrap(), dto);
    }

    #[test]
    fn unassigned_doctor_is_misassignment_and_writes_nothing() {
        let w = ward();
        let err = add_new_regular_medical_record(
            &w.conn,
            &AddNewRegularMedicalRecord {
                patient_id: w.patient,
                doctor_id: w.other_doctor,
                notes: "Routine check".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Misassignment(_)));

        let err = add_new_diagnosis_medical_record(&w.conn, &diagnosis(&w, w.other_doctor)).unwrap_err();
        assert!(matches!(err, CommandError::Misassignment(_)));
        assert_eq!(record_count(&w.conn), 0);
    }

    #[test]
    fn missing_references_resolve_in_order() {
        let w = ward();

        let mut cmd = diagnosis(&w, 900);
        cmd.patient_id = 800;
        cmd.illness_id = 700;
        assert!(matches!(
            add_new_diagnosis_medical_record(&w.conn, &cmd),
            Err(CommandError::NotFound { entity: "Patient", id: 800 })
        ));

        cmd.patient_id = w.patient;
        assert!(matches!(
            add_new_diagnosis_medical_record(&w.conn, &cmd),
            Err(CommandError::NotFound { entity: "Doctor", id: 900 })
        ));

        cmd.doctor_id = w.doctor;
        assert!(matches!(
            add_new_diagnosis_medical_record(&w.conn, &cmd),
            Err(CommandError::NotFound { entity: "Illness", id: 700 })
        ));
        assert_eq!(record_count(&w.conn), 0);
    }

    #[test]
    fn diagnosis_record_carries_illness_and_treatment() {
        let w = ward();
        let dto = add_new_diagnosis_medical_record(&w.conn, &diagnosis(&w, w.doctor)).unwrap();

        let MedicalRecordDto::Diagnosis(record) = &dto else {
            panic!("expected a diagnosis record, got {dto:?}");
        };
        assert_eq!(record.diagnosed_illness.id, w.illness);
        assert_eq!(record.proposed_treatment.duration_days, 5);
        assert_eq!(
            get_treatment(&w.conn, record.proposed_treatment.id).unwrap().record_id,
            record.id
        );
    }

    #[test]
    fn diagnosis_validates_treatment() {
        let w = ward();
        let mut cmd = diagnosis(&w, w.doctor);
        cmd.duration_days = 31;
        assert!(matches!(
            add_new_diagnosis_medical_record(&w.conn, &cmd),
            Err(CommandError::Validation { field: "duration_days", .. })
        ));

        let mut cmd = diagnosis(&w, w.doctor);
        cmd.prescribed_medicine = "  ".into();
        assert!(matches!(
            add_new_diagnosis_medical_record(&w.conn, &cmd),
            Err(CommandError::Validation { field: "prescribed_medicine", .. })
        ));
        assert_eq!(record_count(&w.conn), 0);
    }

    #[test]
    fn responsible_doctor_adjusts_treatment() {
        let w = ward();
        let dto = add_new_diagnosis_medical_record(&w.conn, &diagnosis(&w, w.doctor)).unwrap();

        let adjusted = adjust_treatment_details_within_diagnosis_medical_record(
            &w.conn,
            &AdjustTreatmentDetailsWithinDiagnosisMedicalRecord {
                record_id: dto.id(),
                doctor_id: w.doctor,
                prescribed_medicine: "Bisoprolol".into(),
                duration_days: 14,
            },
        )
        .unwrap();

        let MedicalRecordDto::Diagnosis(record) = adjusted else {
            panic!("expected a diagnosis record");
        };
        assert_eq!(record.proposed_treatment.prescribed_medicine, "Bisoprolol");
        assert_eq!(record.proposed_treatment.duration_days, 14);
    }

    #[test]
    fn adjustment_by_other_doctor_is_misassignment() {
        let w = ward();
        let dto = add_new_diagnosis_medical_record(&w.conn, &diagnosis(&w, w.doctor)).unwrap();
        fixtures::assign(&w.conn, w.other_doctor, w.patient);

        let err = adjust_treatment_details_within_diagnosis_medical_record(
            &w.conn,
            &AdjustTreatmentDetailsWithinDiagnosisMedicalRecord {
                record_id: dto.id(),
                doctor_id: w.other_doctor,
                prescribed_medicine: "Bisoprolol".into(),
                duration_days: 14,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Misassignment(_)));
        assert_eq!(get_medical_record(&w.conn, dto.id()).unwrap(), dto);
    }

    #[test]
    fn adjusting_regular_record_is_wrong_kind() {
        let w = ward();
        let regular = fixtures::regular_record(&w.conn, w.patient, w.doctor);

        let err = adjust_treatment_details_within_diagnosis_medical_record(
            &w.conn,
            &AdjustTreatmentDetailsWithinDiagnosisMedicalRecord {
                record_id: regular,
                doctor_id: w.doctor,
                prescribed_medicine: "Bisoprolol".into(),
                duration_days: 14,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CommandError::WrongRecordKind { expected: RecordKind::Diagnosis, .. }
        ));

        let err = adjust_treatment_details_within_diagnosis_medical_record(
            &w.conn,
            &AdjustTreatmentDetailsWithinDiagnosisMedicalRecord {
                record_id: 4040,
                doctor_id: w.doctor,
                prescribed_medicine: "Bisoprolol".into(),
                duration_days: 14,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::NotFound { entity: "MedicalRecord", id: 4040 }));
    }

    #[test]
    fn patient_history_lists_both_kinds() {
        let w = ward();
        fixtures::regular_record(&w.conn, w.patient, w.doctor);
        add_new_diagnosis_medical_record(&w.conn, &diagnosis(&w, w.doctor)).unwrap();

        let history = list_patient_medical_records(&w.conn, w.patient).unwrap();
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0], MedicalRecordDto::Regular(_)));
        assert!(matches!(history[1], MedicalRecordDto::Diagnosis(_)));

        assert!(matches!(
            list_patient_medical_records(&w.conn, 31337),
            Err(CommandError::NotFound { entity: "Patient", .. })
        ));
    }
}
