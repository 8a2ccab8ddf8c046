use serde::{Deserialize, Serialize};

use super::doctor::DoctorSummary;
use super::enums::Gender;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub age: u8,
    pub gender: Gender,
    pub address: String,
    pub phone_number: Option<String>,
    pub insurance_number: Option<String>,
    /// Bumped on every write touching the patient or its assignments.
    pub version: i64,
}

/// Patient fields before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub name: String,
    pub surname: String,
    pub age: u8,
    pub gender: Gender,
    pub address: String,
    pub phone_number: Option<String>,
    pub insurance_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: i64,
    pub name: String,
    pub surname: String,
}

/// Patient with its assigned doctors eagerly loaded.
#[derive(Debug, Clone)]
pub struct PatientWithDoctors {
    pub patient: Patient,
    pub doctors: Vec<DoctorSummary>,
}
