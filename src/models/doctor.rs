use std::collections::BTreeSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::department::Department;
use super::enums::WeekDay;
use super::patient::PatientSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub address: String,
    pub phone_number: String,
    pub department_id: i64,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub name: String,
    pub surname: String,
    pub address: String,
    pub phone_number: String,
    pub department_id: i64,
}

/// Working hours, owned one-to-one by a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub doctor_id: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub work_days: BTreeSet<WeekDay>,
}

/// Short doctor reference with the department name joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub department_name: String,
}

impl DoctorSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// Doctor with department, schedule and assigned patients eagerly loaded.
#[derive(Debug, Clone)]
pub struct DoctorDetails {
    pub doctor: Doctor,
    pub department: Department,
    pub schedule: Option<DoctorSchedule>,
    pub patients: Vec<PatientSummary>,
}
