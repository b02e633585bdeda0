//! Conversion between dynamically shaped SQLite rows and JSON payloads.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Number, Value};
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::models::Payload;

pub(crate) type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Reads every column of `row` into a payload, keyed by column name.
///
/// Integers and reals become JSON numbers, text stays text and blobs are
/// base64 encoded.
pub(crate) fn row_to_payload(row: &SqliteRow) -> Result<Payload, sqlx::Error> {
    let mut payload = Payload::new();

    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let kind = if raw.is_null() {
            None
        } else {
            Some(raw.type_info().name().to_string())
        };

        let value = match kind.as_deref() {
            None => Value::Null,
            Some("INTEGER") | Some("BOOLEAN") => Value::from(row.try_get::<i64, _>(idx)?),
            Some("REAL") => Number::from_f64(row.try_get::<f64, _>(idx)?)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Some("BLOB") => Value::String(BASE64.encode(row.try_get::<Vec<u8>, _>(idx)?)),
            Some(_) => Value::String(row.try_get::<String, _>(idx)?),
        };

        payload.insert(column.name().to_string(), value);
    }

    Ok(payload)
}

/// Binds one JSON value as the next query parameter.
///
/// Booleans are stored as 0/1; arrays and objects as their JSON text.
pub(crate) fn bind_json<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => query.bind(int),
            None => query.bind(number.as_f64()),
        },
        Value::String(text) => query.bind(text.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

/// True for plain SQL identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
