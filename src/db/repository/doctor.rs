use std::collections::BTreeSet;
use std::str::FromStr;

use rusqlite::{params, Connection, Row};

use super::{contains_pattern, format_time, parse_time};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const DOCTOR_COLUMNS: &str =
    "d.id, d.name, d.surname, d.address, d.phone_number, d.department_id, d.version";

pub fn insert_doctor(conn: &Connection, doctor: &NewDoctor) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (name, surname, address, phone_number, department_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            doctor.name,
            doctor.surname,
            doctor.address,
            doctor.phone_number,
            doctor.department_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_doctor(conn: &Connection, id: i64) -> Result<Option<Doctor>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors d WHERE d.id = ?1");
    let result = conn.query_row(&sql, params![id], read_doctor);

    match result {
        Ok(doctor) => Ok(Some(doctor)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    search_doctors(conn, &DoctorFilter::default())
}

pub fn search_doctors(conn: &Connection, filter: &DoctorFilter) -> Result<Vec<Doctor>, DatabaseError> {
    let mut sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors d WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(ref name) = filter.name {
        sql.push_str(&format!(" AND d.name LIKE ?{param_idx} ESCAPE '\\'"));
        params_vec.push(Box::new(contains_pattern(name)));
        param_idx += 1;
    }
    if let Some(ref surname) = filter.surname {
        sql.push_str(&format!(" AND d.surname LIKE ?{param_idx} ESCAPE '\\'"));
        params_vec.push(Box::new(contains_pattern(surname)));
        param_idx += 1;
    }
    if let Some(department_id) = filter.department_id {
        sql.push_str(&format!(" AND d.department_id = ?{param_idx}"));
        params_vec.push(Box::new(department_id));
        param_idx += 1;
    }
    if let Some(day) = filter.works_on {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM schedule_work_days w
                          WHERE w.doctor_id = d.id AND w.week_day = ?{param_idx})"
        ));
        params_vec.push(Box::new(day.as_str()));
        param_idx += 1;
    }
    let _ = param_idx;

    sql.push_str(" ORDER BY d.id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), read_doctor)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// One page of doctors ordered by id. Pages past the end are empty.
pub fn list_doctors_page(conn: &Connection, page: Page) -> Result<Vec<Doctor>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors d ORDER BY d.id LIMIT ?1 OFFSET ?2");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![page.size, page.offset()], read_doctor)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Writes personal fields and department, bumping the version.
///
/// Returns `false` when the row is missing or its version moved on.
pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET name = ?2, surname = ?3, address = ?4, phone_number = ?5,
         department_id = ?6, version = version + 1
         WHERE id = ?1 AND version = ?7",
        params![
            doctor.id,
            doctor.name,
            doctor.surname,
            doctor.address,
            doctor.phone_number,
            doctor.department_id,
            doctor.version,
        ],
    )?;
    Ok(changed == 1)
}

pub fn touch_doctor(conn: &Connection, id: i64, expected_version: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET version = version + 1 WHERE id = ?1 AND version = ?2",
        params![id, expected_version],
    )?;
    Ok(changed == 1)
}

/// Deletes the doctor; the owned schedule and its work days cascade.
pub fn delete_doctor(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM doctors WHERE id = ?1", params![id])?;
    Ok(changed == 1)
}

pub fn insert_schedule(conn: &Connection, schedule: &DoctorSchedule) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctor_schedules (doctor_id, start_time, end_time) VALUES (?1, ?2, ?3)",
        params![
            schedule.doctor_id,
            format_time(&schedule.start_time),
            format_time(&schedule.end_time),
        ],
    )?;
    insert_work_days(conn, schedule.doctor_id, &schedule.work_days)
}

/// Overwrites hours and replaces the full set of work days.
pub fn replace_schedule(conn: &Connection, schedule: &DoctorSchedule) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctor_schedules SET start_time = ?2, end_time = ?3 WHERE doctor_id = ?1",
        params![
            schedule.doctor_id,
            format_time(&schedule.start_time),
            format_time(&schedule.end_time),
        ],
    )?;
    if changed == 0 {
        return Ok(false);
    }
    conn.execute(
        "DELETE FROM schedule_work_days WHERE doctor_id = ?1",
        params![schedule.doctor_id],
    )?;
    insert_work_days(conn, schedule.doctor_id, &schedule.work_days)?;
    Ok(true)
}

fn insert_work_days(
    conn: &Connection,
    doctor_id: i64,
    days: &BTreeSet<WeekDay>,
) -> Result<(), DatabaseError> {
    let mut stmt =
        conn.prepare("INSERT INTO schedule_work_days (doctor_id, week_day) VALUES (?1, ?2)")?;
    for day in days {
        stmt.execute(params![doctor_id, day.as_str()])?;
    }
    Ok(())
}

pub fn get_schedule(conn: &Connection, doctor_id: i64) -> Result<Option<DoctorSchedule>, DatabaseError> {
    let result = conn.query_row(
        "SELECT start_time, end_time FROM doctor_schedules WHERE doctor_id = ?1",
        params![doctor_id],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
    );

    let (start, end) = match result {
        Ok(times) => times,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut stmt =
        conn.prepare("SELECT week_day FROM schedule_work_days WHERE doctor_id = ?1")?;
    let rows = stmt.query_map(params![doctor_id], |row| row.get::<_, String>(0))?;
    let mut work_days = BTreeSet::new();
    for day in rows {
        work_days.insert(WeekDay::from_str(&day?)?);
    }

    Ok(Some(DoctorSchedule {
        doctor_id,
        start_time: parse_time(&start)?,
        end_time: parse_time(&end)?,
        work_days,
    }))
}

pub fn get_doctor_summary(conn: &Connection, id: i64) -> Result<Option<DoctorSummary>, DatabaseError> {
    let result = conn.query_row(
        "SELECT d.id, d.name, d.surname, dep.name
         FROM doctors d JOIN departments dep ON dep.id = d.department_id
         WHERE d.id = ?1",
        params![id],
        |row| {
            Ok(DoctorSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                surname: row.get(2)?,
                department_name: row.get(3)?,
            })
        },
    );

    match result {
        Ok(summary) => Ok(Some(summary)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Doctor with department, schedule and assigned patients.
pub fn get_doctor_with_details(
    conn: &Connection,
    id: i64,
) -> Result<Option<DoctorDetails>, DatabaseError> {
    let Some(doctor) = get_doctor(conn, id)? else {
        return Ok(None);
    };
    let department = super::get_department(conn, doctor.department_id)?.ok_or_else(|| {
        DatabaseError::NotFound {
            entity_type: "Department".into(),
            id: doctor.department_id,
        }
    })?;
    let schedule = get_schedule(conn, id)?;

    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.surname
         FROM doctor_patient_assignments a
         JOIN patients p ON p.id = a.patient_id
         WHERE a.doctor_id = ?1
         ORDER BY p.id",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        Ok(PatientSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            surname: row.get(2)?,
        })
    })?;
    let patients = rows.collect::<Result<Vec<_>, _>>()?;

    Ok(Some(DoctorDetails {
        doctor,
        department,
        schedule,
        patients,
    }))
}

fn read_doctor(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
        address: row.get(3)?,
        phone_number: row.get(4)?,
        department_id: row.get(5)?,
        version: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn schedule_round_trips_through_store() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let doc = fixtures::doctor(&conn, dep, "Cooper");

        let schedule = get_schedule(&conn, doc).unwrap().unwrap();
        assert_eq!(schedule.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(
            schedule.work_days,
            BTreeSet::from([WeekDay::Monday, WeekDay::Tuesday])
        );
    }

    #[test]
    fn replace_schedule_swaps_work_days() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let doc = fixtures::doctor(&conn, dep, "Cooper");

        let updated = DoctorSchedule {
            doctor_id: doc,
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            work_days: BTreeSet::from([WeekDay::Saturday, WeekDay::Sunday]),
        };
        assert!(replace_schedule(&conn, &updated).unwrap());
        assert_eq!(get_schedule(&conn, doc).unwrap().unwrap(), updated);

        let missing = DoctorSchedule { doctor_id: 999, ..updated };
        assert!(!replace_schedule(&conn, &missing).unwrap());
    }

    #[test]
    fn search_by_department_and_work_day() {
        let conn = open_memory_database().unwrap();
        let cardio = fixtures::department(&conn, "Cardiology");
        let neuro = fixtures::department(&conn, "Neurology");
        fixtures::doctor(&conn, cardio, "Cooper");
        fixtures::doctor(&conn, neuro, "Denver");

        let in_cardio = search_doctors(&conn, &DoctorFilter {
            department_id: Some(cardio),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(in_cardio.len(), 1);
        assert_eq!(in_cardio[0].surname, "Cooper");

        let on_sunday = search_doctors(&conn, &DoctorFilter {
            works_on: Some(WeekDay::Sunday),
            ..Default::default()
        })
        .unwrap();
        assert!(on_sunday.is_empty());
    }

    #[test]
    fn delete_cascades_owned_schedule() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let doc = fixtures::doctor(&conn, dep, "Cooper");

        assert!(delete_doctor(&conn, doc).unwrap());
        assert!(get_all_doctors(&conn).unwrap().is_empty());
        assert!(get_schedule(&conn, doc).unwrap().is_none());
        let days: i64 = conn
            .query_row("SELECT COUNT(*) FROM schedule_work_days", [], |row| row.get(0))
            .unwrap();
        assert_eq!(days, 0);
    }

    #[test]
    fn details_load_department_and_patients() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let doc = fixtures::doctor(&conn, dep, "Cooper");
        let p1 = fixtures::patient(&conn, "Chris");
        let p2 = fixtures::patient(&conn, "Anna");
        fixtures::assign(&conn, doc, p1);
        fixtures::assign(&conn, doc, p2);

        let details = get_doctor_with_details(&conn, doc).unwrap().unwrap();
        assert_eq!(details.department.name, "Cardiology");
        assert!(details.schedule.is_some());
        assert_eq!(
            details.patients.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![p1, p2]
        );
    }
}
