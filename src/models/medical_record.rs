use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::doctor::DoctorSummary;
use super::enums::RecordKind;
use super::illness::Illness;
use super::patient::PatientSummary;

/// Fields shared by every medical record variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub examined_at: DateTime<Utc>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: i64,
    pub record_id: i64,
    pub prescribed_medicine: String,
    pub duration_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularMedicalRecord {
    pub header: RecordHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisMedicalRecord {
    pub header: RecordHeader,
    pub illness_id: i64,
    pub treatment: Treatment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MedicalRecord {
    Regular(RegularMedicalRecord),
    Diagnosis(DiagnosisMedicalRecord),
}

impl MedicalRecord {
    pub fn header(&self) -> &RecordHeader {
        match self {
            MedicalRecord::Regular(r) => &r.header,
            MedicalRecord::Diagnosis(d) => &d.header,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            MedicalRecord::Regular(_) => RecordKind::Regular,
            MedicalRecord::Diagnosis(_) => RecordKind::Diagnosis,
        }
    }
}

/// Record header before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewRecordHeader {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub examined_at: DateTime<Utc>,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct NewTreatment {
    pub prescribed_medicine: String,
    pub duration_days: u32,
}

/// Record with patient, doctor and (for diagnoses) illness eagerly loaded.
#[derive(Debug, Clone)]
pub struct MedicalRecordDetails {
    pub patient: PatientSummary,
    pub doctor: DoctorSummary,
    pub body: RecordDetailsBody,
}

#[derive(Debug, Clone)]
pub enum RecordDetailsBody {
    Regular(RegularMedicalRecord),
    Diagnosis(DiagnosisMedicalRecord, Illness),
}
