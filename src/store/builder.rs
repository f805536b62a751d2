//! Statement text for the repository CRUD calls. Values never appear in the
//! generated SQL; they are bound through dialect placeholders.

use crate::model::QueryOptions;
use crate::store::Dialect;
use itertools::Itertools;

pub fn select(table: &str, fields: Option<&str>, options: &QueryOptions, dialect: Dialect) -> String {
    format!(
        "SELECT {} FROM {}{}",
        fields.filter(|f| !f.trim().is_empty()).unwrap_or("*"),
        table,
        options.to_sql(dialect)
    )
}

pub fn insert<'a>(table: &str, columns: impl IntoIterator<Item = &'a String>, dialect: Dialect) -> String {
    let columns: Vec<&String> = columns.into_iter().collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.iter().join(","),
        (1..=columns.len()).map(|n| dialect.placeholder(n)).join(",")
    )
}

pub fn update<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a String>,
    options: &QueryOptions,
    dialect: Dialect,
) -> String {
    let assignments = columns
        .into_iter()
        .enumerate()
        .map(|(i, column)| format!("{}={}", column, dialect.placeholder(i + 1)))
        .join(",");
    format!("UPDATE {} SET {}{}", table, assignments, options.to_sql(dialect))
}

pub fn delete(table: &str, options: &QueryOptions, dialect: Dialect) -> String {
    format!("DELETE FROM {}{}", table, options.to_sql(dialect))
}
