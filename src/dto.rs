//! Response projection: external-facing views of stored entities.
//!
//! Relationships are flattened into short nested summaries; raw foreign-key
//! collections never leave the crate. Projection is pure: everything it needs
//! must already be loaded by the repository's eager reads.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::*;
use crate::models::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDto {
    pub id: i64,
    pub name: String,
}

impl From<&Department> for DepartmentDto {
    fn from(dep: &Department) -> Self {
        Self { id: dep.id, name: dep.name.clone() }
    }
}

impl From<&DepartmentDto> for Department {
    fn from(dto: &DepartmentDto) -> Self {
        Self { id: dto.id, name: dto.name.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllnessDto {
    pub id: i64,
    pub name: String,
    pub severity: IllnessSeverity,
}

impl From<&Illness> for IllnessDto {
    fn from(ill: &Illness) -> Self {
        Self { id: ill.id, name: ill.name.clone(), severity: ill.severity }
    }
}

impl From<&IllnessDto> for Illness {
    fn from(dto: &IllnessDto) -> Self {
        Self { id: dto.id, name: dto.name.clone(), severity: dto.severity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentDto {
    pub id: i64,
    pub record_id: i64,
    pub prescribed_medicine: String,
    pub duration_days: u32,
}

impl From<&Treatment> for TreatmentDto {
    fn from(t: &Treatment) -> Self {
        Self {
            id: t.id,
            record_id: t.record_id,
            prescribed_medicine: t.prescribed_medicine.clone(),
            duration_days: t.duration_days,
        }
    }
}

impl From<&TreatmentDto> for Treatment {
    fn from(dto: &TreatmentDto) -> Self {
        Self {
            id: dto.id,
            record_id: dto.record_id,
            prescribed_medicine: dto.prescribed_medicine.clone(),
            duration_days: dto.duration_days,
        }
    }
}

// ── Patients ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorShortInfo {
    pub id: i64,
    pub full_name: String,
    pub department: String,
}

impl From<&DoctorSummary> for DoctorShortInfo {
    fn from(d: &DoctorSummary) -> Self {
        Self {
            id: d.id,
            full_name: d.full_name(),
            department: d.department_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDto {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub age: u8,
    pub gender: Gender,
    pub address: String,
    pub phone_number: Option<String>,
    pub insurance_number: Option<String>,
    pub version: i64,
    pub doctors: Vec<DoctorShortInfo>,
}

impl From<&PatientWithDoctors> for PatientDto {
    fn from(loaded: &PatientWithDoctors) -> Self {
        let p = &loaded.patient;
        Self {
            id: p.id,
            name: p.name.clone(),
            surname: p.surname.clone(),
            age: p.age,
            gender: p.gender,
            address: p.address.clone(),
            phone_number: p.phone_number.clone(),
            insurance_number: p.insurance_number.clone(),
            version: p.version,
            doctors: loaded.doctors.iter().map(DoctorShortInfo::from).collect(),
        }
    }
}

impl From<&PatientDto> for Patient {
    fn from(dto: &PatientDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name.clone(),
            surname: dto.surname.clone(),
            age: dto.age,
            gender: dto.gender,
            address: dto.address.clone(),
            phone_number: dto.phone_number.clone(),
            insurance_number: dto.insurance_number.clone(),
            version: dto.version,
        }
    }
}

// ── Doctors ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientShortInfo {
    pub id: i64,
    pub full_name: String,
}

impl From<&PatientSummary> for PatientShortInfo {
    fn from(p: &PatientSummary) -> Self {
        Self {
            id: p.id,
            full_name: format!("{} {}", p.name, p.surname),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub work_days: Vec<WeekDay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDto {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub address: String,
    pub phone_number: String,
    pub version: i64,
    pub department: DepartmentDto,
    pub schedule: Option<ScheduleDto>,
    pub patients: Vec<PatientShortInfo>,
}

impl From<&DoctorDetails> for DoctorDto {
    fn from(loaded: &DoctorDetails) -> Self {
        let d = &loaded.doctor;
        Self {
            id: d.id,
            name: d.name.clone(),
            surname: d.surname.clone(),
            address: d.address.clone(),
            phone_number: d.phone_number.clone(),
            version: d.version,
            department: DepartmentDto::from(&loaded.department),
            schedule: loaded.schedule.as_ref().map(|s| ScheduleDto {
                start_time: s.start_time,
                end_time: s.end_time,
                work_days: s.work_days.iter().copied().collect(),
            }),
            patients: loaded.patients.iter().map(PatientShortInfo::from).collect(),
        }
    }
}

impl From<&DoctorDto> for Doctor {
    fn from(dto: &DoctorDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name.clone(),
            surname: dto.surname.clone(),
            address: dto.address.clone(),
            phone_number: dto.phone_number.clone(),
            department_id: dto.department.id,
            version: dto.version,
        }
    }
}

// ── Medical records ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecordDto {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRecordDto {
    pub id: i64,
    pub full_name: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IllnessRecordDto {
    pub id: i64,
    pub name: String,
    pub severity: IllnessSeverity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentRecordDto {
    pub id: i64,
    pub prescribed_medicine: String,
    pub duration_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularMedicalRecordDto {
    pub id: i64,
    pub examined_patient: PatientRecordDto,
    pub responsible_doctor: DoctorRecordDto,
    pub date_of_examination: DateTime<Utc>,
    pub examination_notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisMedicalRecordDto {
    pub id: i64,
    pub examined_patient: PatientRecordDto,
    pub responsible_doctor: DoctorRecordDto,
    pub date_of_examination: DateTime<Utc>,
    pub examination_notes: String,
    pub diagnosed_illness: IllnessRecordDto,
    pub proposed_treatment: TreatmentRecordDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MedicalRecordDto {
    Regular(RegularMedicalRecordDto),
    Diagnosis(DiagnosisMedicalRecordDto),
}

impl MedicalRecordDto {
    pub fn id(&self) -> i64 {
        match self {
            MedicalRecordDto::Regular(r) => r.id,
            MedicalRecordDto::Diagnosis(d) => d.id,
        }
    }
}

impl From<&MedicalRecordDetails> for MedicalRecordDto {
    fn from(loaded: &MedicalRecordDetails) -> Self {
        let patient = PatientRecordDto {
            id: loaded.patient.id,
            full_name: format!("{} {}", loaded.patient.name, loaded.patient.surname),
        };
        let doctor = DoctorRecordDto {
            id: loaded.doctor.id,
            full_name: loaded.doctor.full_name(),
            department: loaded.doctor.department_name.clone(),
        };

        match &loaded.body {
            RecordDetailsBody::Regular(r) => MedicalRecordDto::Regular(RegularMedicalRecordDto {
                id: r.header.id,
                examined_patient: patient,
                responsible_doctor: doctor,
                date_of_examination: r.header.examined_at,
                examination_notes: r.header.notes.clone(),
            }),
            RecordDetailsBody::Diagnosis(d, illness) => {
                MedicalRecordDto::Diagnosis(DiagnosisMedicalRecordDto {
                    id: d.header.id,
                    examined_patient: patient,
                    responsible_doctor: doctor,
                    date_of_examination: d.header.examined_at,
                    examination_notes: d.header.notes.clone(),
                    diagnosed_illness: IllnessRecordDto {
                        id: illness.id,
                        name: illness.name.clone(),
                        severity: illness.severity,
                    },
                    proposed_treatment: TreatmentRecordDto {
                        id: d.treatment.id,
                        prescribed_medicine: d.treatment.prescribed_medicine.clone(),
                        duration_days: d.treatment.duration_days,
                    },
                })
            }
        }
    }
}

impl From<&MedicalRecordDto> for MedicalRecord {
    fn from(dto: &MedicalRecordDto) -> Self {
        match dto {
            MedicalRecordDto::Regular(r) => MedicalRecord::Regular(RegularMedicalRecord {
                header: RecordHeader {
                    id: r.id,
                    patient_id: r.examined_patient.id,
                    doctor_id: r.responsible_doctor.id,
                    examined_at: r.date_of_examination,
                    notes: r.examination_notes.clone(),
                },
            }),
            MedicalRecordDto::Diagnosis(d) => MedicalRecord::Diagnosis(DiagnosisMedicalRecord {
                header: RecordHeader {
                    id: d.id,
                    patient_id: d.examined_patient.id,
                    doctor_id: d.responsible_doctor.id,
                    examined_at: d.date_of_examination,
                    notes: d.examination_notes.clone(),
                },
                illness_id: d.diagnosed_illness.id,
                treatment: Treatment {
                    id: d.proposed_treatment.id,
                    record_id: d.id,
                    prescribed_medicine: d.proposed_treatment.prescribed_medicine.clone(),
                    duration_days: d.proposed_treatment.duration_days,
                },
            }),
        }
    }
}
