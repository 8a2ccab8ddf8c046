//! Repository layer: entity-scoped database operations.
//!
//! Pure storage access: no business rules live here. Each sub-module covers
//! one entity (get, get-all, filtered search, insert, update, delete) plus the
//! eager-loading joined reads the command layer inspects relationships with.
//! Multi-statement writes expect the caller to hold a transaction.

mod assignment;
mod department;
mod doctor;
mod illness;
mod medical_record;
mod patient;

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};

use super::DatabaseError;

pub use assignment::*;
pub use department::*;
pub use doctor::*;
pub use illness::*;
pub use medical_record::*;
pub use patient::*;

const TIME_FORMAT: &str = "%H:%M:%S";

fn format_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_time(value: &str) -> Result<NaiveTime, DatabaseError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad time '{value}': {e}")))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp '{value}': {e}")))
}

/// `LIKE` pattern matching `value` literally anywhere in the column. Pair
/// with `ESCAPE '\'`.
fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Lee"), "%Lee%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
