//! Table dump scripts written by `Repository::backup`.

use crate::error::{Error, Result};
use crate::store::value::sql_literal;
use crate::store::Dialect;
use chrono::{DateTime, Duration, Local};
use itertools::Itertools;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const STAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

/// Statement returning the table DDL, and the column holding it.
pub(crate) fn ddl_query(dialect: Dialect, table: &str) -> Result<(String, usize)> {
    match dialect {
        Dialect::MySql => Ok((format!("SHOW CREATE TABLE {}", table), 1)),
        Dialect::Sqlite => Ok((
            format!(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = {}",
                sql_literal(&Value::from(table), false)
            ),
            0,
        )),
        Dialect::Postgres => Err(Error::Unsupported {
            operation: "backup",
            driver: dialect.name(),
        }),
    }
}

/// Drop, create and one `INSERT` per row, in that order. Row values are in
/// table column order.
pub(crate) fn script(table: &str, ddl: &str, rows: &[Vec<Value>], dialect: Dialect) -> String {
    let backslash = dialect == Dialect::MySql;
    let mut script = String::from("-- Table creation\r\n");
    script.push_str(&format!("\nDROP TABLE IF EXISTS {};\n", table));
    script.push_str(ddl.trim_end().trim_end_matches(';'));
    script.push_str(";\n");
    script.push_str("-- Data\r\n");
    for row in rows {
        let values = row.iter().map(|v| sql_literal(v, backslash)).join(",");
        script.push_str(&format!("INSERT INTO {} VALUES({});\n", table, values));
    }
    script
}

fn file_name(stem: &str, at: DateTime<Local>) -> String {
    format!("{}.{}.sql", stem, at.format(STAMP_FORMAT))
}

/// Writes `contents` to `<dir>/<stem>.<stamp>.sql`, never replacing an
/// existing file: a taken name moves the stamp forward one second.
pub(crate) async fn write_unique(
    dir: &Path,
    stem: &str,
    at: DateTime<Local>,
    contents: &str,
) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let mut at = at;
    loop {
        let path = dir.join(file_name(stem, at));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(contents.as_bytes()).await?;
                file.flush().await?;
                return Ok(path);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                at += Duration::seconds(1);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_script_layout() {
        let rows = vec![
            vec![json!(1), json!("it's\r\nfine")],
            vec![json!(2), json!(null)],
        ];
        let script = script(
            "sayings",
            "CREATE TABLE sayings (id INTEGER, quote TEXT)",
            &rows,
            Dialect::MySql,
        );

        assert_eq!(script.matches("DROP TABLE IF EXISTS").count(), 1);
        assert_eq!(script.matches("CREATE TABLE").count(), 1);
        assert_eq!(script.matches("INSERT INTO").count(), 2);
        assert!(script.starts_with("-- Table creation\r\n"));
        assert!(script.contains("-- Data\r\n"));
        assert!(script.contains(r"INSERT INTO sayings VALUES(1,'it\'s\r\nfine');"));
        assert!(script.contains("INSERT INTO sayings VALUES(2,NULL);"));
    }

    #[test]
    fn test_postgres_has_no_ddl_source() {
        assert!(matches!(
            ddl_query(Dialect::Postgres, "t"),
            Err(Error::Unsupported { operation: "backup", .. })
        ));
        assert_eq!(ddl_query(Dialect::MySql, "t").unwrap(), ("SHOW CREATE TABLE t".to_string(), 1));
    }

    #[tokio::test]
    async fn test_write_unique_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 59).unwrap();

        let first = write_unique(dir.path(), "repo_t", at, "one").await.unwrap();
        let second = write_unique(dir.path(), "repo_t", at, "two").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "repo_t.20240309.140559.sql");
        assert_eq!(second.file_name().unwrap(), "repo_t.20240309.140600.sql");
        assert_eq!(std::fs::read_to_string(first).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "two");
    }
}
