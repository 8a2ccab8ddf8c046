//! `hospital` command-line front end. Every subcommand maps to one command or
//! query and prints its result as pretty JSON.

use std::path::PathBuf;

use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::commands::departments::{self, ChangeDepartmentClassification, RegisterNewHospitalDepartment};
use crate::commands::doctors::{
    self, DoctorQuery, EmployNewDoctor, UpdateDoctorAssignedPatients, UpdateDoctorPersonalInfo,
};
use crate::commands::illnesses::{self, RegisterExistingIllness};
use crate::commands::medical_records::{
    self, AddNewDiagnosisMedicalRecord, AddNewRegularMedicalRecord,
    AdjustTreatmentDetailsWithinDiagnosisMedicalRecord,
};
use crate::commands::patients::{
    self, PatientQuery, RegisterNewPatient, UpdatePatientAssignedDoctors, UpdatePatientDetails,
};
use crate::commands::CommandError;
use crate::config::{ConfigError, HospitalConfig};
use crate::core_state::{CoreError, CoreState};

#[derive(Parser)]
#[command(name = "hospital", version)]
#[command(about = "Hospital administration: patients, doctors, departments and medical records")]
pub struct Cli {
    /// Database file (default: $HOSPITAL_DB_PATH or the per-user data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register a new hospital department
    AddDepartment { name: String },
    /// Change a department's classification (name)
    RenameDepartment { department_id: i64, name: String },
    /// Delete a department without doctors
    DeleteDepartment { department_id: i64 },
    /// Show one department
    GetDepartment { id: i64 },
    /// List departments
    ListDepartments {
        /// Only names containing this text
        #[arg(long)]
        name: Option<String>,
    },

    /// Register an illness (LOW, MEDIUM or HIGH severity)
    AddIllness { name: String, severity: String },
    /// Delete an illness no diagnosis refers to
    DeleteIllness { illness_id: i64 },
    /// Show one illness
    GetIllness { id: i64 },
    /// List illnesses
    ListIllnesses {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        severity: Option<String>,
    },

    /// Register a new patient (gender M, F or O)
    AddPatient {
        name: String,
        surname: String,
        age: i64,
        gender: String,
        address: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        insurance: Option<String>,
    },
    /// Update a patient's demographic details
    UpdatePatient {
        patient_id: i64,
        name: String,
        surname: String,
        age: i64,
        gender: String,
        address: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        insurance: Option<String>,
        /// Fail unless the stored version matches
        #[arg(long)]
        expected_version: Option<i64>,
    },
    /// Replace the set of doctors assigned to a patient (no ids clears it)
    AssignDoctors {
        patient_id: i64,
        /// Doctor ids, comma-separated
        #[arg(long = "doctors", value_delimiter = ',')]
        doctor_ids: Vec<i64>,
    },
    /// Delete a patient with no doctors and no records
    DeletePatient { patient_id: i64 },
    /// Show one patient with assigned doctors
    GetPatient { id: i64 },
    /// List patients page by page
    ListPatients {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Search patients
    SearchPatients {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        min_age: Option<i64>,
        #[arg(long)]
        max_age: Option<i64>,
        #[arg(long)]
        doctor: Option<i64>,
    },

    /// Employ a new doctor with a weekly schedule
    EmployDoctor {
        name: String,
        surname: String,
        address: String,
        phone: String,
        department_id: i64,
        /// Shift start, HH:MM:SS
        #[arg(long)]
        start: NaiveTime,
        /// Shift end, HH:MM:SS
        #[arg(long)]
        end: NaiveTime,
        /// Work days, comma-separated (monday..sunday)
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<String>,
        /// Initial patient ids, comma-separated
        #[arg(long, value_delimiter = ',')]
        patients: Vec<i64>,
    },
    /// Update a doctor's personal info, department and schedule
    UpdateDoctor {
        doctor_id: i64,
        name: String,
        surname: String,
        address: String,
        phone: String,
        department_id: i64,
        #[arg(long)]
        start: NaiveTime,
        #[arg(long)]
        end: NaiveTime,
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<String>,
        #[arg(long)]
        expected_version: Option<i64>,
    },
    /// Replace the set of patients assigned to a doctor (no ids clears it)
    AssignPatients {
        doctor_id: i64,
        #[arg(long = "patients", value_delimiter = ',')]
        patient_ids: Vec<i64>,
    },
    /// Delete a doctor with no patients and no records
    DeleteDoctor { doctor_id: i64 },
    /// Show one doctor with department, schedule and patients
    GetDoctor { id: i64 },
    /// List doctors page by page
    ListDoctors {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Search doctors
    SearchDoctors {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        department: Option<i64>,
        /// Week day the doctor works on
        #[arg(long)]
        works_on: Option<String>,
    },

    /// Add a regular medical record
    AddRecord {
        patient_id: i64,
        doctor_id: i64,
        notes: String,
    },
    /// Add a diagnosis medical record with its treatment
    AddDiagnosis {
        patient_id: i64,
        doctor_id: i64,
        illness_id: i64,
        notes: String,
        #[arg(long)]
        medicine: String,
        /// Treatment length in days (1-30)
        #[arg(long)]
        days: i64,
    },
    /// Adjust the treatment of a diagnosis record
    AdjustTreatment {
        record_id: i64,
        doctor_id: i64,
        #[arg(long)]
        medicine: String,
        #[arg(long)]
        days: i64,
    },
    /// Show one medical record
    GetRecord { id: i64 },
    /// List a patient's medical records
    PatientRecords { patient_id: i64 },
    /// Show one treatment
    GetTreatment { id: i64 },
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Cannot render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Failure class printed next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Core(CoreError::Command(e)) => e.kind(),
            CliError::Core(_) => "core",
            CliError::Config(_) => "config",
            CliError::Output(_) => "output",
        }
    }
}

impl Cli {
    /// Environment configuration with the `--db` flag applied on top.
    pub fn resolve_config(&self) -> Result<HospitalConfig, CliError> {
        let mut config = HospitalConfig::from_env()?;
        if let Some(ref path) = self.db {
            config.db_path = path.clone();
        }
        Ok(config)
    }
}

fn exec<T: Serialize>(
    state: &CoreState,
    f: impl FnOnce(&Connection) -> Result<T, CommandError>,
) -> Result<String, CliError> {
    let value = state.with_conn(f)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Runs one subcommand against `state` and returns its JSON output.
pub fn dispatch(state: &CoreState, command: Command) -> Result<String, CliError> {
    match command {
        Command::AddDepartment { name } => exec(state, |c| {
            departments::register_new_hospital_department(c, &RegisterNewHospitalDepartment { name })
        }),
        Command::RenameDepartment { department_id, name } => exec(state, |c| {
            departments::change_department_classification(
                c,
                &ChangeDepartmentClassification { department_id, name },
            )
        }),
        Command::DeleteDepartment { department_id } => {
            exec(state, |c| departments::delete_department(c, department_id))
        }
        Command::GetDepartment { id } => exec(state, |c| departments::get_department(c, id)),
        Command::ListDepartments { name } => {
            exec(state, |c| departments::list_departments(c, name.as_deref()))
        }

        Command::AddIllness { name, severity } => exec(state, |c| {
            illnesses::register_existing_illness(c, &RegisterExistingIllness { name, severity })
        }),
        Command::DeleteIllness { illness_id } => {
            exec(state, |c| illnesses::delete_illness(c, illness_id))
        }
        Command::GetIllness { id } => exec(state, |c| illnesses::get_illness(c, id)),
        Command::ListIllnesses { name, severity } => exec(state, |c| {
            illnesses::list_illnesses(c, name.as_deref(), severity.as_deref())
        }),

        Command::AddPatient { name, surname, age, gender, address, phone, insurance } => {
            let cmd = RegisterNewPatient {
                name,
                surname,
                age,
                gender,
                address,
                phone_number: phone,
                insurance_number: insurance,
            };
            exec(state, |c| patients::register_new_patient(c, &cmd))
        }
        Command::UpdatePatient {
            patient_id,
            name,
            surname,
            age,
            gender,
            address,
            phone,
            insurance,
            expected_version,
        } => {
            let cmd = UpdatePatientDetails {
                patient_id,
                name,
                surname,
                age,
                gender,
                address,
                phone_number: phone,
                insurance_number: insurance,
                expected_version,
            };
            exec(state, |c| patients::update_patient_details(c, &cmd))
        }
        Command::AssignDoctors { patient_id, doctor_ids } => exec(state, |c| {
            patients::update_patient_assigned_doctors(
                c,
                &UpdatePatientAssignedDoctors { patient_id, doctor_ids },
            )
        }),
        Command::DeletePatient { patient_id } => {
            exec(state, |c| patients::delete_patient(c, patient_id))
        }
        Command::GetPatient { id } => exec(state, |c| patients::get_patient(c, id)),
        Command::ListPatients { page, page_size } => {
            exec(state, |c| patients::list_patients(c, page, page_size))
        }
        Command::SearchPatients { name, surname, gender, min_age, max_age, doctor } => {
            let query = PatientQuery { name, surname, gender, min_age, max_age, doctor_id: doctor };
            exec(state, |c| patients::search_patients(c, &query))
        }

        Command::EmployDoctor {
            name,
            surname,
            address,
            phone,
            department_id,
            start,
            end,
            days,
            patients,
        } => {
            let cmd = EmployNewDoctor {
                name,
                surname,
                address,
                phone_number: phone,
                department_id,
                schedule_start: start,
                schedule_end: end,
                work_days: days,
                patient_ids: patients,
            };
            exec(state, |c| doctors::employ_new_doctor(c, &cmd))
        }
        Command::UpdateDoctor {
            doctor_id,
            name,
            surname,
            address,
            phone,
            department_id,
            start,
            end,
            days,
            expected_version,
        } => {
            let cmd = UpdateDoctorPersonalInfo {
                doctor_id,
                name,
                surname,
                address,
                phone_number: phone,
                department_id,
                schedule_start: start,
                schedule_end: end,
                work_days: days,
                expected_version,
            };
            exec(state, |c| doctors::update_doctor_personal_info(c, &cmd))
        }
        Command::AssignPatients { doctor_id, patient_ids } => exec(state, |c| {
            doctors::update_doctor_assigned_patients(
                c,
                &UpdateDoctorAssignedPatients { doctor_id, patient_ids },
            )
        }),
        Command::DeleteDoctor { doctor_id } => exec(state, |c| doctors::delete_doctor(c, doctor_id)),
        Command::GetDoctor { id } => exec(state, |c| doctors::get_doctor(c, id)),
        Command::ListDoctors { page, page_size } => {
            exec(state, |c| doctors::list_doctors(c, page, page_size))
        }
        Command::SearchDoctors { name, surname, department, works_on } => {
            let query = DoctorQuery { name, surname, department_id: department, works_on };
            exec(state, |c| doctors::search_doctors(c, &query))
        }

        Command::AddRecord { patient_id, doctor_id, notes } => exec(state, |c| {
            medical_records::add_new_regular_medical_record(
                c,
                &AddNewRegularMedicalRecord { patient_id, doctor_id, notes },
            )
        }),
        Command::AddDiagnosis { patient_id, doctor_id, illness_id, notes, medicine, days } => {
            let cmd = AddNewDiagnosisMedicalRecord {
                patient_id,
                doctor_id,
                notes,
                illness_id,
                prescribed_medicine: medicine,
                duration_days: days,
            };
            exec(state, |c| medical_records::add_new_diagnosis_medical_record(c, &cmd))
        }
        Command::AdjustTreatment { record_id, doctor_id, medicine, days } => {
            let cmd = AdjustTreatmentDetailsWithinDiagnosisMedicalRecord {
                record_id,
                doctor_id,
                prescribed_medicine: medicine,
                duration_days: days,
            };
            exec(state, |c| {
                medical_records::adjust_treatment_details_within_diagnosis_medical_record(c, &cmd)
            })
        }
        Command::GetRecord { id } => exec(state, |c| medical_records::get_medical_record(c, id)),
        Command::PatientRecords { patient_id } => {
            exec(state, |c| medical_records::list_patient_medical_records(c, patient_id))
        }
        Command::GetTreatment { id } => exec(state, |c| medical_records::get_treatment(c, id)),
    }
}

/// Opens the store described by `config` and dispatches `command`.
pub fn run(config: HospitalConfig, command: Command) -> Result<String, CliError> {
    let state = CoreState::open(config)?;
    dispatch(&state, command)
}
