//! Row decoding helpers shared by the PostgreSQL repositories.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row};
use std::fmt::Display;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};

/// Reads a column, mapping decode failures to `DatabaseError`.
pub(super) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(&format!("Failed to get {}", name), e))
}

pub(super) fn timestamp(row: &PgRow, name: &str) -> Result<Timestamp, DomainError> {
    column::<DateTime<Utc>>(row, name).map(Timestamp::from_datetime)
}

pub(super) fn optional_timestamp(
    row: &PgRow,
    name: &str,
) -> Result<Option<Timestamp>, DomainError> {
    Ok(column::<Option<DateTime<Utc>>>(row, name)?.map(Timestamp::from_datetime))
}

/// Parses a stored enum string.
pub(super) fn parse_column<T>(row: &PgRow, name: &str) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = column(row, name)?;
    raw.parse().map_err(|e: T::Err| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} '{}': {}", name, raw, e),
        )
    })
}

/// Reads a non-negative integer column stored as INTEGER.
pub(super) fn unsigned(row: &PgRow, name: &str) -> Result<u32, DomainError> {
    let value: i32 = column(row, name)?;
    u32::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Negative {}: {}", name, value),
        )
    })
}

pub(super) fn optional_datetime(ts: Option<&Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}
