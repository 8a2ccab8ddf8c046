//! Field-level checks shared by the command modules.
//!
//! Every check returns the normalised value so callers never persist the raw
//! input by accident.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::NaiveTime;

use super::CommandError;
use crate::db::DatabaseError;
use crate::models::enums::WeekDay;
use crate::models::Page;

pub const MAX_PERSON_NAME_LEN: usize = 50;
pub const MAX_ADDRESS_LEN: usize = 200;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_INSURANCE_LEN: usize = 20;
pub const MAX_CLASSIFICATION_LEN: usize = 100;
pub const MAX_ILLNESS_NAME_LEN: usize = 100;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_MEDICINE_LEN: usize = 100;
pub const MAX_PAGE_SIZE: u32 = 100;

pub const PATIENT_AGE: RangeInclusive<i64> = 0..=130;
pub const TREATMENT_DAYS: RangeInclusive<i64> = 1..=30;

/// Trimmed, non-empty, at most `max` characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, CommandError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommandError::validation(field, "is required"));
    }
    bounded_text(field, trimmed, max)
}

/// Trimmed, at most `max` characters; may be empty.
pub fn bounded_text(field: &'static str, value: &str, max: usize) -> Result<String, CommandError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(CommandError::validation(
            field,
            format!("must be {max} characters or fewer"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Blank optional values collapse to `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, CommandError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => bounded_text(field, v, max).map(Some),
    }
}

pub fn age(value: i64) -> Result<u8, CommandError> {
    if !PATIENT_AGE.contains(&value) {
        return Err(CommandError::validation(
            "age",
            format!(
                "must be between {} and {}",
                PATIENT_AGE.start(),
                PATIENT_AGE.end()
            ),
        ));
    }
    // The range above fits in u8
    Ok(value as u8)
}

pub fn treatment_duration(value: i64) -> Result<u32, CommandError> {
    if !TREATMENT_DAYS.contains(&value) {
        return Err(CommandError::validation(
            "duration_days",
            format!(
                "must be between {} and {} days",
                TREATMENT_DAYS.start(),
                TREATMENT_DAYS.end()
            ),
        ));
    }
    Ok(value as u32)
}

pub fn schedule_hours(start: NaiveTime, end: NaiveTime) -> Result<(), CommandError> {
    if start >= end {
        return Err(CommandError::validation(
            "schedule",
            format!("start {start} must be before end {end}"),
        ));
    }
    Ok(())
}

/// Non-empty; duplicates collapse.
pub fn work_days(days: &[WeekDay]) -> Result<BTreeSet<WeekDay>, CommandError> {
    let set: BTreeSet<WeekDay> = days.iter().copied().collect();
    if set.is_empty() {
        return Err(CommandError::validation("work_days", "at least one work day is required"));
    }
    Ok(set)
}

pub fn page(number: u32, size: u32) -> Result<Page, CommandError> {
    if number == 0 {
        return Err(CommandError::validation("page", "page number must be positive"));
    }
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(CommandError::validation(
            "page_size",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }
    Ok(Page { number, size })
}

/// Parses a closed-set value (gender, severity, weekday) from user input.
pub fn parse_enum<T>(field: &'static str, value: &str) -> Result<T, CommandError>
where
    T: FromStr<Err = DatabaseError>,
{
    T::from_str(value.trim()).map_err(|_| {
        CommandError::validation(field, format!("'{value}' is not an accepted value"))
    })
}
