use std::str::FromStr;

use rusqlite::{params, Connection};

use super::contains_pattern;
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

type IllnessRow = (i64, String, String);

pub fn insert_illness(
    conn: &Connection,
    name: &str,
    severity: IllnessSeverity,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO illnesses (name, severity) VALUES (?1, ?2)",
        params![name, severity.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_illness(conn: &Connection, id: i64) -> Result<Option<Illness>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, severity FROM illnesses WHERE id = ?1",
        params![id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    );

    match result {
        Ok(row) => Ok(Some(illness_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_illnesses(conn: &Connection) -> Result<Vec<Illness>, DatabaseError> {
    search_illnesses(conn, &IllnessFilter::default())
}

pub fn search_illnesses(conn: &Connection, filter: &IllnessFilter) -> Result<Vec<Illness>, DatabaseError> {
    let mut sql = String::from("SELECT id, name, severity FROM illnesses WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1u32;

    if let Some(ref name) = filter.name {
        sql.push_str(&format!(" AND name LIKE ?{param_idx} ESCAPE '\\'"));
        params_vec.push(Box::new(contains_pattern(name)));
        param_idx += 1;
    }
    if let Some(severity) = filter.severity {
        sql.push_str(&format!(" AND severity = ?{param_idx}"));
        params_vec.push(Box::new(severity.as_str()));
        param_idx += 1;
    }
    let _ = param_idx;

    sql.push_str(" ORDER BY id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?;

    let mut illnesses = Vec::new();
    for row in rows {
        illnesses.push(illness_from_row(row?)?);
    }
    Ok(illnesses)
}

pub fn update_illness(conn: &Connection, illness: &Illness) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE illnesses SET name = ?2, severity = ?3 WHERE id = ?1",
        params![illness.id, illness.name, illness.severity.as_str()],
    )?;
    Ok(changed == 1)
}

pub fn delete_illness(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM illnesses WHERE id = ?1", params![id])?;
    Ok(changed == 1)
}

fn illness_from_row((id, name, severity): IllnessRow) -> Result<Illness, DatabaseError> {
    Ok(Illness {
        id,
        name,
        severity: IllnessSeverity::from_str(&severity)?,
    })
}
