use serde::Deserialize;

use super::validation::{required_text, MAX_CLASSIFICATION_LEN};
use super::{begin, require, CommandError};
use crate::db::repository;
use crate::dto::DepartmentDto;
use crate::models::{Department, DepartmentFilter};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterNewHospitalDepartment {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeDepartmentClassification {
    pub department_id: i64,
    pub name: String,
}

pub fn register_new_hospital_department(
    conn: &rusqlite::Connection,
    cmd: &RegisterNewHospitalDepartment,
) -> Result<DepartmentDto, CommandError> {
    let name = required_text("name", &cmd.name, MAX_CLASSIFICATION_LEN)?;

    let tx = begin(conn)?;
    let id = repository::insert_department(&tx, &name)?;
    tx.commit()?;

    tracing::info!(department_id = id, "Department registered");
    Ok(DepartmentDto { id, name })
}

/// Renames a department. Staffed departments may be renamed.
pub fn change_department_classification(
    conn: &rusqlite::Connection,
    cmd: &ChangeDepartmentClassification,
) -> Result<DepartmentDto, CommandError> {
    let name = required_text("name", &cmd.name, MAX_CLASSIFICATION_LEN)?;

    let tx = begin(conn)?;
    let mut department = require(
        repository::get_department(&tx, cmd.department_id)?,
        "Department",
        cmd.department_id,
    )?;
    department.name = name;
    if !repository::update_department(&tx, &department)? {
        return Err(CommandError::not_found("Department", department.id));
    }
    tx.commit()?;

    tracing::info!(department_id = department.id, "Department reclassified");
    Ok(DepartmentDto::from(&department))
}

/// Removes an unstaffed department.
pub fn delete_department(
    conn: &rusqlite::Connection,
    department_id: i64,
) -> Result<DepartmentDto, CommandError> {
    let tx = begin(conn)?;
    let department = require(
        repository::get_department(&tx, department_id)?,
        "Department",
        department_id,
    )?;

    let doctors = repository::count_doctors_in_department(&tx, department_id)?;
    if doctors > 0 {
        tracing::warn!(department_id, doctors, "Department still staffed, delete refused");
        return Err(CommandError::ReferentialIntegrity {
            entity: "Department",
            id: department_id,
            dependents: format!("{doctors} doctor(s)"),
        });
    }

    repository::delete_department(&tx, department_id)?;
    tx.commit()?;

    tracing::info!(department_id, "Department deleted");
    Ok(DepartmentDto::from(&department))
}

pub fn get_department(conn: &rusqlite::Connection, id: i64) -> Result<DepartmentDto, CommandError> {
    let department = require(repository::get_department(conn, id)?, "Department", id)?;
    Ok(DepartmentDto::from(&department))
}

/// All departments, optionally narrowed to names containing `name`.
pub fn list_departments(
    conn: &rusqlite::Connection,
    name: Option<&str>,
) -> Result<Vec<DepartmentDto>, CommandError> {
    let filter = DepartmentFilter {
        name: name.map(str::to_string),
    };
    let departments: Vec<Department> = repository::search_departments(conn, &filter)?;
    Ok(departments.iter().map(DepartmentDto::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    fn register(conn: &rusqlite::Connection, name: &str) -> DepartmentDto {
        register_new_hospital_department(conn, &RegisterNewHospitalDepartment { name: name.into() })
            .unwrap()
    }

    #[test]
    fn register_trims_name() {
        let conn = open_memory_database().unwrap();
        let dep = register(&conn, "  Cardiology ");
        assert_eq!(dep.name, "Cardiology");
        assert_eq!(get_department(&conn, dep.id).unwrap(), dep);
    }

    #[test]
    fn register_rejects_blank_and_long_names() {
        let conn = open_memory_database().unwrap();
        for name in ["", "   ", &"x".repeat(MAX_CLASSIFICATION_LEN + 1)] {
            let err = register_new_hospital_department(
                &conn,
                &RegisterNewHospitalDepartment { name: name.to_string() },
            )
            .unwrap_err();
            assert!(matches!(err, CommandError::Validation { field: "name", .. }));
        }
        assert!(list_departments(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn staffed_department_can_be_renamed_but_not_deleted() {
        let conn = open_memory_database().unwrap();
        let dep = register(&conn, "Cardiology");
        fixtures::doctor(&conn, dep.id, "Hudson");

        let renamed = change_department_classification(
            &conn,
            &ChangeDepartmentClassification {
                department_id: dep.id,
                name: "Cardiovascular surgery".into(),
            },
        )
        .unwrap();
        assert_eq!(renamed.id, dep.id);
        assert_eq!(get_department(&conn, dep.id).unwrap().name, "Cardiovascular surgery");

        let err = delete_department(&conn, dep.id).unwrap_err();
        match err {
            CommandError::ReferentialIntegrity { entity, id, dependents } => {
                assert_eq!(entity, "Department");
                assert_eq!(id, dep.id);
                assert_eq!(dependents, "1 doctor(s)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(get_department(&conn, dep.id).is_ok());
    }

    #[test]
    fn empty_department_is_deleted() {
        let conn = open_memory_database().unwrap();
        let dep = register(&conn, "Dermatology");
        assert_eq!(delete_department(&conn, dep.id).unwrap(), dep);
        assert!(matches!(
            get_department(&conn, dep.id),
            Err(CommandError::NotFound { entity: "Department", .. })
        ));
    }

    #[test]
    fn rename_of_missing_department_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = change_department_classification(
            &conn,
            &ChangeDepartmentClassification { department_id: 42, name: "Oncology".into() },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::NotFound { entity: "Department", id: 42 }));
    }

    #[test]
    fn list_filters_by_name() {
        let conn = open_memory_database().unwrap();
        register(&conn, "Cardiology");
        register(&conn, "Neurology");
        register(&conn, "Respiratory diseases");

        assert_eq!(list_departments(&conn, None).unwrap().len(), 3);
        let found = list_departments(&conn, Some("logy")).unwrap();
        let names: Vec<&str> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Cardiology", "Neurology"]);
    }
}
