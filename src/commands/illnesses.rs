use serde::Deserialize;

use super::validation::{parse_enum, required_text, MAX_ILLNESS_NAME_LEN};
use super::{begin, require, CommandError};
use crate::db::repository;
use crate::dto::IllnessDto;
use crate::models::enums::IllnessSeverity;
use crate::models::{IllnessFilter, MedicalRecordFilter};

/// Catalogues an illness. Names are not unique: each call yields a new id.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterExistingIllness {
    pub name: String,
    pub severity: String,
}

pub fn register_existing_illness(
    conn: &rusqlite::Connection,
    cmd: &RegisterExistingIllness,
) -> Result<IllnessDto, CommandError> {
    let name = required_text("name", &cmd.name, MAX_ILLNESS_NAME_LEN)?;
    let severity: IllnessSeverity = parse_enum("severity", &cmd.severity)?;

    let tx = begin(conn)?;
    let id = repository::insert_illness(&tx, &name, severity)?;
    tx.commit()?;

    tracing::info!(illness_id = id, severity = %severity, "Illness registered");
    Ok(IllnessDto { id, name, severity })
}

/// Removes an illness no diagnosis refers to.
pub fn delete_illness(conn: &rusqlite::Connection, illness_id: i64) -> Result<IllnessDto, CommandError> {
    let tx = begin(conn)?;
    let illness = require(repository::get_illness(&tx, illness_id)?, "Illness", illness_id)?;

    let diagnoses = repository::count_medical_records(
        &tx,
        &MedicalRecordFilter {
            illness_id: Some(illness_id),
            ..Default::default()
        },
    )?;
    if diagnoses > 0 {
        tracing::warn!(illness_id, diagnoses, "Illness still diagnosed, delete refused");
        return Err(CommandError::ReferentialIntegrity {
            entity: "Illness",
            id: illness_id,
            dependents: format!("{diagnoses} diagnosis record(s)"),
        });
    }

    repository::delete_illness(&tx, illness_id)?;
    tx.commit()?;

    tracing::info!(illness_id, "Illness deleted");
    Ok(IllnessDto::from(&illness))
}

pub fn get_illness(conn: &rusqlite::Connection, id: i64) -> Result<IllnessDto, CommandError> {
    let illness = require(repository::get_illness(conn, id)?, "Illness", id)?;
    Ok(IllnessDto::from(&illness))
}

pub fn list_illnesses(
    conn: &rusqlite::Connection,
    name: Option<&str>,
    severity: Option<&str>,
) -> Result<Vec<IllnessDto>, CommandError> {
    let filter = IllnessFilter {
        name: name.map(str::to_string),
        severity: severity.map(|s| parse_enum("severity", s)).transpose()?,
    };
    let illnesses = repository::search_illnesses(conn, &filter)?;
    Ok(illnesses.iter().map(IllnessDto::from).collect())
}
