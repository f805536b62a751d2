//! Conversions between JSON values and driver values.

use serde_json::{Map, Value};
use sqlx::any::{Any, AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Column, Row, ValueRef};

/// Generic key-value row used when no result type is configured.
pub type Record = Map<String, Value>;

pub(crate) type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

pub(crate) fn bind_value<'q>(query: AnyQuery<'q>, value: &Value) -> AnyQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => query.bind(int),
            None => query.bind(number.as_f64().unwrap_or_default()),
        },
        Value::String(text) => query.bind(text.clone()),
        // Nested structures are stored as their JSON text
        nested => query.bind(nested.to_string()),
    }
}

/// Decodes every column of `row` into a JSON value, keyed by column name.
pub fn row_to_record(row: &AnyRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

pub(crate) fn decode_column(row: &AnyRow, index: usize) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(int) = row.try_get::<i64, _>(index) {
        return Ok(Value::from(int));
    }
    if let Ok(float) = row.try_get::<f64, _>(index) {
        return Ok(Value::from(float));
    }
    if let Ok(text) = row.try_get::<String, _>(index) {
        return Ok(Value::String(text));
    }
    if let Ok(flag) = row.try_get::<bool, _>(index) {
        return Ok(Value::Bool(flag));
    }
    if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
        return Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    }
    Ok(Value::Null)
}

/// SQL literal for `value`, for inclusion in generated scripts.
pub(crate) fn sql_literal(value: &Value, backslash_escapes: bool) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(flag) => (if *flag { "1" } else { "0" }).to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => quote(text, backslash_escapes),
        nested => quote(&nested.to_string(), backslash_escapes),
    }
}

fn quote(text: &str, backslash_escapes: bool) -> String {
    if !backslash_escapes {
        return format!("'{}'", text.replace('\'', "''"));
    }

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                quoted.push_str("\\r\\n");
            }
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '"' => quoted.push_str("\\\""),
            '\0' => quoted.push_str("\\0"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}
