//! Column codecs shared by the SQLite repositories.
//!
//! Instants are stored as Unix seconds, ids as hyphenated UUID text and
//! status enums as their lowercase names.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

pub(crate) fn unix(instant: DateTime<Utc>) -> i64 {
    instant.timestamp()
}

pub(crate) fn opt_unix(instant: Option<DateTime<Utc>>) -> Option<i64> {
    instant.map(unix)
}

fn conversion_error(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}

pub(crate) fn from_unix(idx: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| conversion_error(idx, Type::Integer, format!("timestamp out of range: {secs}")))
}

pub(crate) fn instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    from_unix(idx, row.get(idx)?)
}

pub(crate) fn opt_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<i64>>(idx)?.map(|secs| from_unix(idx, secs)).transpose()
}

pub(crate) fn id(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|err| conversion_error(idx, Type::Text, err.to_string()))
}

pub(crate) fn opt_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| Uuid::parse_str(&raw).map_err(|err| conversion_error(idx, Type::Text, err.to_string())))
        .transpose()
}

pub(crate) fn status<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|message| conversion_error(idx, Type::Text, message))
}

pub(crate) fn minutes(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw).map_err(|err| conversion_error(idx, Type::Integer, err.to_string()))
}
