//! Repository layer — entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`, one sub-module per entity
//! group. Integrity rules live in the schema; writes here surface the
//! engine's rejection unchanged as `DatabaseError::Sqlite`.

mod appointment;
mod billing;
mod consistency;
mod patient;
mod prescription;
mod room;
mod staff;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::DatabaseError;

pub use appointment::*;
pub use billing::*;
pub use consistency::*;
pub use patient::*;
pub use prescription::*;
pub use room::*;
pub use staff::*;

/// Stored timestamp layout. Whole seconds print exactly like SQLite's
/// `CURRENT_TIMESTAMP`; a fractional part is appended only when present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// `julianday()` resolves fractions to the millisecond, so the schema's
/// ordering checks see anything finer as equal.
pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(field: &str, raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|_| {
        DatabaseError::InvalidValue {
            field: field.into(),
            value: raw.into(),
        }
    })
}

pub(crate) fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| DatabaseError::InvalidValue {
        field: field.into(),
        value: raw.into(),
    })
}

pub(crate) fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|_| DatabaseError::InvalidValue {
        field: field.into(),
        value: raw.into(),
    })
}

pub(crate) fn parse_optional_uuid(
    field: &str,
    raw: Option<String>,
) -> Result<Option<Uuid>, DatabaseError> {
    raw.map(|s| parse_uuid(field, &s)).transpose()
}
