use rusqlite::{params, Connection};

use super::contains_pattern;
use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_department(conn: &Connection, name: &str) -> Result<i64, DatabaseError> {
    conn.execute("INSERT INTO departments (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

pub fn get_department(conn: &Connection, id: i64) -> Result<Option<Department>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name FROM departments WHERE id = ?1",
        params![id],
        |row| Ok(Department { id: row.get(0)?, name: row.get(1)? }),
    );

    match result {
        Ok(dep) => Ok(Some(dep)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_departments(conn: &Connection) -> Result<Vec<Department>, DatabaseError> {
    search_departments(conn, &DepartmentFilter::default())
}

pub fn search_departments(
    conn: &Connection,
    filter: &DepartmentFilter,
) -> Result<Vec<Department>, DatabaseError> {
    let mut sql = String::from("SELECT id, name FROM departments WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(ref name) = filter.name {
        sql.push_str(" AND name LIKE ?1 ESCAPE '\\'");
        params_vec.push(Box::new(contains_pattern(name)));
    }
    sql.push_str(" ORDER BY id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(Department { id: row.get(0)?, name: row.get(1)? })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Returns `false` when no department has the given id.
pub fn update_department(conn: &Connection, dep: &Department) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE departments SET name = ?2 WHERE id = ?1",
        params![dep.id, dep.name],
    )?;
    Ok(changed == 1)
}

pub fn delete_department(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM departments WHERE id = ?1", params![id])?;
    Ok(changed == 1)
}

pub fn count_doctors_in_department(conn: &Connection, id: i64) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM doctors WHERE department_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_assigns_increasing_ids() {
        let conn = open_memory_database().unwrap();
        let a = insert_department(&conn, "Cardiology").unwrap();
        let b = insert_department(&conn, "Cardiology").unwrap();
        assert!(a > 0);
        assert!(b > a);
    }

    #[test]
    fn search_matches_substring() {
        let conn = open_memory_database().unwrap();
        fixtures::department(&conn, "Heart diseases");
        fixtures::department(&conn, "Respiratory diseases");
        fixtures::department(&conn, "Neurology");

        let found = search_departments(&conn, &DepartmentFilter { name: Some("diseases".into()) })
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(get_all_departments(&conn).unwrap().len(), 3);
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let conn = open_memory_database().unwrap();
        fixtures::department(&conn, "Ward_A");
        fixtures::department(&conn, "WardXA");
        fixtures::department(&conn, "Day care 100%");

        let underscore = search_departments(&conn, &DepartmentFilter { name: Some("d_A".into()) })
            .unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].name, "Ward_A");

        let percent = search_departments(&conn, &DepartmentFilter { name: Some("%".into()) })
            .unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].name, "Day care 100%");
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let conn = open_memory_database().unwrap();
        let missing = Department { id: 42, name: "Ghost".into() };
        assert!(!update_department(&conn, &missing).unwrap());
        assert!(!delete_department(&conn, 42).unwrap());
        assert!(get_department(&conn, 42).unwrap().is_none());
    }

    #[test]
    fn counts_doctors_per_department() {
        let conn = open_memory_database().unwrap();
        let dep = fixtures::department(&conn, "Cardiology");
        let empty = fixtures::department(&conn, "Neurology");
        fixtures::doctor(&conn, dep, "Cooper");
        fixtures::doctor(&conn, dep, "Denver");

        assert_eq!(count_doctors_in_department(&conn, dep).unwrap(), 2);
        assert_eq!(count_doctors_in_department(&conn, empty).unwrap(), 0);
    }
}
