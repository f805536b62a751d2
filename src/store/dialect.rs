use serde::{Deserialize, Serialize};

/// SQL flavour spoken by the connected driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Maps the driver prefix of a connection string (`mysql:host=...`).
    pub fn from_driver(driver: &str) -> Option<Self> {
        match driver.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "pgsql" | "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Positional placeholder for the `n`th (1-based) bound value.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${}", n),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }

    pub fn limit_clause(self, limit: u64, offset: u64) -> String {
        match self {
            Self::Postgres => format!(" LIMIT {} OFFSET {}", limit, offset),
            Self::MySql | Self::Sqlite => format!(" LIMIT {},{}", offset, limit),
        }
    }

    /// Statement that forces UTF-8 on a freshly opened connection.
    pub fn utf8_statement(self) -> &'static str {
        match self {
            Self::MySql => "SET NAMES utf8",
            Self::Postgres => "SET client_encoding TO 'UTF8'",
            Self::Sqlite => "PRAGMA encoding = 'UTF-8'",
        }
    }

    pub fn begin_statement(self) -> &'static str {
        match self {
            Self::MySql => "START TRANSACTION",
            Self::Postgres | Self::Sqlite => "BEGIN",
        }
    }

    /// Random ordering expression usable in `ORDER BY`.
    pub fn random_function(self) -> &'static str {
        match self {
            Self::MySql => "RAND()",
            Self::Postgres | Self::Sqlite => "RANDOM()",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_aliases() {
        assert_eq!(Dialect::from_driver("mysql"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_driver("PgSQL"), Some(Dialect::Postgres));
        assert_eq!(Dialect::from_driver("sqlite"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_driver("oci"), None);
    }

    #[test]
    fn test_limit_clause_per_dialect() {
        assert_eq!(Dialect::MySql.limit_clause(10, 5), " LIMIT 5,10");
        assert_eq!(Dialect::Sqlite.limit_clause(10, 0), " LIMIT 0,10");
        assert_eq!(Dialect::Postgres.limit_clause(10, 5), " LIMIT 10 OFFSET 5");
    }
}
