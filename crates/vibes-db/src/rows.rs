//! Column decoding shared by the query modules.
//!
//! Ids are stored as UUID text, timestamps as RFC 3339 text, and list-valued
//! columns as JSON arrays.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use thiserror::Error;
use uuid::Uuid;

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

#[derive(Debug, Error)]
#[error("unknown enum value '{0}'")]
struct UnknownVariant(String);

pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

pub(crate) fn strings_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn json_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn enum_col<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    parse(&s).ok_or_else(|| conversion_error(idx, UnknownVariant(s)))
}

pub(crate) fn count_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    Ok(n.max(0) as u64)
}

pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use vibes_types::models::CampaignStatus;

    #[test]
    fn unknown_enum_text_is_a_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();

        let status = conn
            .query_row("SELECT 'active'", [], |row| enum_col(row, 0, CampaignStatus::parse))
            .unwrap();
        assert_eq!(status, CampaignStatus::Active);

        let err = conn
            .query_row("SELECT 'paused'", [], |row| enum_col(row, 0, CampaignStatus::parse))
            .unwrap_err();
        match err {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, inner) => {
                assert_eq!(inner.to_string(), "unknown enum value 'paused'");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
