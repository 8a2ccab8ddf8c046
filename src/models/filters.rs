use super::enums::{Gender, IllnessSeverity, RecordKind, WeekDay};

#[derive(Debug, Default)]
pub struct PatientFilter {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub gender: Option<Gender>,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    pub doctor_id: Option<i64>,
}

#[derive(Debug, Default)]
pub struct DoctorFilter {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub department_id: Option<i64>,
    pub works_on: Option<WeekDay>,
}

#[derive(Debug, Default)]
pub struct DepartmentFilter {
    pub name: Option<String>,
}

#[derive(Debug, Default)]
pub struct IllnessFilter {
    pub name: Option<String>,
    pub severity: Option<IllnessSeverity>,
}

#[derive(Debug, Default)]
pub struct MedicalRecordFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub kind: Option<RecordKind>,
    pub illness_id: Option<i64>,
}

/// One page of a listing. Both fields are 1-based and validated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn offset(&self) -> i64 {
        i64::from(self.number.saturating_sub(1)) * i64::from(self.size)
    }
}
