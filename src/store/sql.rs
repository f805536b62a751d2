use crate::error::{Error, Result};
use crate::model::QueryOptions;
use crate::store::backup;
use crate::store::builder;
use crate::store::connection::ConnectionSpec;
use crate::store::traits::Repository;
use crate::store::value::{bind_value, decode_column, row_to_record, Record};
use crate::store::Dialect;
use async_trait::async_trait;
use chrono::Local;
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::any::{Any, AnyPoolOptions, AnyQueryResult, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::{AnyConnection, AnyPool, Connection, Either, Executor, Row};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;

const DEFAULT_RESOURCES_DIR: &str = "resources";

enum Link {
    Owned(AnyConnection),
    Pooled(PoolConnection<Any>),
}

/// Connection a repository runs on: opened for it alone, or leased from a pool
/// and returned when the repository is dropped.
///
/// A pooled connection released inside an open transaction is rolled back
/// before the pool hands it out again.
struct Lease {
    link: Option<Link>,
    in_transaction: bool,
}

impl Lease {
    fn new(link: Link) -> Self {
        Self {
            link: Some(link),
            in_transaction: false,
        }
    }

    fn connection(&mut self) -> Result<&mut AnyConnection> {
        match self.link.as_mut() {
            Some(Link::Owned(conn)) => Ok(conn),
            Some(Link::Pooled(conn)) => Ok(&mut **conn),
            None => Err(Error::PersistenceUnavailable {
                resource: "lease".to_string(),
                message: "connection already released".to_string(),
            }),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.in_transaction {
            return;
        }
        // Closing an owned connection ends its transaction on the server side.
        let Some(Link::Pooled(mut conn)) = self.link.take() else {
            return;
        };
        log::warn!(target: "runrs::repo", "Rolling back transaction left open on a pooled connection");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let outcome = {
                        let link: &mut AnyConnection = &mut conn;
                        link.execute("ROLLBACK").await
                    };
                    if let Err(err) = outcome {
                        log::error!(target: "runrs::repo", "Rollback on release failed: {}", err);
                        drop(conn.detach());
                    }
                });
            }
            Err(_) => drop(conn.detach()),
        }
    }
}

/// Outcome of one executed statement.
pub struct Statement {
    pub sql: String,
    pub rows: Vec<AnyRow>,
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

impl Statement {
    pub fn records(&self) -> Result<Vec<Record>> {
        self.rows
            .iter()
            .map(|row| row_to_record(row).map_err(|err| self.failed(err)))
            .collect()
    }

    /// Maps every row onto `T` through its serde field names.
    pub fn fetch<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.records()?
            .into_iter()
            .map(|record| serde_json::from_value(Value::Object(record)).map_err(Error::from))
            .collect()
    }

    fn failed(&self, err: sqlx::Error) -> Error {
        Error::QueryFailed {
            query: self.sql.clone(),
            message: err.to_string(),
        }
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("rows", &self.rows.len())
            .field("rows_affected", &self.rows_affected)
            .field("last_insert_id", &self.last_insert_id)
            .finish()
    }
}

/// CRUD and raw-query handle over a single connection.
///
/// `T` is the type rows are mapped onto by `find`; it defaults to a generic
/// [`Record`] and can be changed with [`SqlRepository::to`].
pub struct SqlRepository<T = Record> {
    conn: Lease,
    dialect: Dialect,
    table: Option<String>,
    fields: Option<String>,
    resources_dir: PathBuf,
    _mapping: PhantomData<fn() -> T>,
}

impl SqlRepository<Record> {
    /// Opens a dedicated connection described by `driver:k=v;k=v,user,password`.
    pub async fn connect(spec: &str) -> Result<Self> {
        let spec = ConnectionSpec::parse(spec)?;
        sqlx::any::install_default_drivers();

        let started = Instant::now();
        let conn = AnyConnection::connect(spec.url())
            .await
            .map_err(|err| unavailable(&spec.resource, err))?;
        log::info!(
            target: "runrs::repo",
            "Connected to {} in {} ms",
            spec.resource,
            started.elapsed().as_millis()
        );

        let mut repo = Self::over(Lease::new(Link::Owned(conn)), spec.dialect);
        repo.run(spec.dialect.utf8_statement(), None).await?;
        Ok(repo)
    }

    fn over(conn: Lease, dialect: Dialect) -> Self {
        Self {
            conn,
            dialect,
            table: None,
            fields: None,
            resources_dir: PathBuf::from(DEFAULT_RESOURCES_DIR),
            _mapping: PhantomData,
        }
    }
}

impl<T> SqlRepository<T> {
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    /// Comma separated column list for `find`; `*` when unset.
    pub fn select(&mut self, fields: impl Into<String>) -> &mut Self {
        self.fields = Some(fields.into());
        self
    }

    /// Same connection and settings, mapping rows onto `U`.
    pub fn to<U>(self) -> SqlRepository<U> {
        SqlRepository {
            conn: self.conn,
            dialect: self.dialect,
            table: self.table,
            fields: self.fields,
            resources_dir: self.resources_dir,
            _mapping: PhantomData,
        }
    }

    /// Directory backups are written to.
    pub fn with_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resources_dir = dir.into();
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    /// Whether `begin_transaction` ran without a matching commit or rollback.
    pub fn in_transaction(&self) -> bool {
        self.conn.in_transaction
    }

    fn require_table(&self) -> Result<String> {
        self.table.clone().ok_or(Error::NoSourceTable)
    }

    /// Executes `sql`, through the prepared protocol when `data` is given.
    async fn run(&mut self, sql: &str, data: Option<&[Value]>) -> Result<Statement> {
        let started = Instant::now();
        let conn = self.conn.connection()?;
        let outcome = match data {
            Some(values) => {
                let query = values.iter().fold(sqlx::query(sql), bind_value);
                drain(query.fetch_many(conn)).await
            }
            None => drain(conn.fetch_many(sql)).await,
        };
        let elapsed = started.elapsed().as_millis();

        match outcome {
            Ok(mut statement) => {
                log::debug!(
                    target: "runrs::repo",
                    "{} [{} ms, {} rows, {} affected]",
                    sql,
                    elapsed,
                    statement.rows.len(),
                    statement.rows_affected
                );
                statement.sql = sql.to_string();
                Ok(statement)
            }
            Err(err) => {
                log::warn!(target: "runrs::repo", "{} failed after {} ms: {}", sql, elapsed, err);
                Err(Error::QueryFailed {
                    query: sql.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }
}

async fn drain(
    mut stream: BoxStream<'_, std::result::Result<Either<AnyQueryResult, AnyRow>, sqlx::Error>>,
) -> std::result::Result<Statement, sqlx::Error> {
    let mut statement = Statement {
        sql: String::new(),
        rows: Vec::new(),
        rows_affected: 0,
        last_insert_id: None,
    };
    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => {
                statement.rows_affected += done.rows_affected();
                if let Some(id) = done.last_insert_id() {
                    statement.last_insert_id = Some(id);
                }
            }
            Either::Right(row) => statement.rows.push(row),
        }
    }
    Ok(statement)
}

fn unavailable(resource: &str, err: sqlx::Error) -> Error {
    log::error!(target: "runrs::repo", "Connection to {} failed: {}", resource, err);
    Error::PersistenceUnavailable {
        resource: resource.to_string(),
        message: err.to_string(),
    }
}

/// Serialized field names and values of an item.
fn item_fields<I: Serialize + ?Sized>(item: &I) -> Result<Record> {
    match serde_json::to_value(item)? {
        Value::Object(fields) if !fields.is_empty() => Ok(fields),
        Value::Object(_) => Err(Error::InvalidItem("no fields".to_string())),
        other => Err(Error::InvalidItem(format!("got {}", other))),
    }
}

#[async_trait]
impl<T> Repository for SqlRepository<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Item = T;

    async fn add<I>(&mut self, item: &I) -> Result<Option<i64>>
    where
        I: Serialize + Sync + ?Sized,
    {
        let table = self.require_table()?;
        let fields = item_fields(item)?;
        let sql = builder::insert(&table, fields.keys(), self.dialect);
        let values: Vec<Value> = fields.into_iter().map(|(_, value)| value).collect();
        Ok(self.run(&sql, Some(values.as_slice())).await?.last_insert_id)
    }

    async fn find(&mut self, options: &QueryOptions) -> Result<Vec<T>> {
        let table = self.require_table()?;
        let sql = builder::select(&table, self.fields.as_deref(), options, self.dialect);
        self.run(&sql, None).await?.fetch()
    }

    async fn modify<I>(&mut self, item: &I, options: &QueryOptions) -> Result<u64>
    where
        I: Serialize + Sync + ?Sized,
    {
        let table = self.require_table()?;
        let fields = item_fields(item)?;
        let sql = builder::update(&table, fields.keys(), options, self.dialect);
        let values: Vec<Value> = fields.into_iter().map(|(_, value)| value).collect();
        Ok(self.run(&sql, Some(values.as_slice())).await?.rows_affected)
    }

    async fn remove(&mut self, options: &QueryOptions) -> Result<u64> {
        let table = self.require_table()?;
        let sql = builder::delete(&table, options, self.dialect);
        Ok(self.run(&sql, None).await?.rows_affected)
    }

    async fn query(&mut self, sql: &str, data: Option<&[Value]>) -> Result<Statement> {
        self.run(sql, data).await
    }

    async fn begin_transaction(&mut self) -> Result<()> {
        let begin = self.dialect.begin_statement();
        self.run(begin, None).await?;
        self.conn.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.run("COMMIT", None).await?;
        self.conn.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.run("ROLLBACK", None).await?;
        self.conn.in_transaction = false;
        Ok(())
    }

    async fn backup(&mut self, file_name: Option<&str>) -> Result<PathBuf> {
        let table = self.require_table()?;
        let (ddl_sql, column) = backup::ddl_query(self.dialect, &table)?;

        let definition = self.run(&ddl_sql, None).await?;
        let ddl = definition
            .rows
            .first()
            .and_then(|row| decode_column(row, column).ok())
            .and_then(|value| value.as_str().map(str::to_string))
            .ok_or_else(|| Error::QueryFailed {
                query: ddl_sql.clone(),
                message: format!("no definition found for table {}", table),
            })?;

        let data = self.run(&format!("SELECT * FROM {}", table), None).await?;
        let rows = data
            .rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|index| decode_column(row, index))
                    .collect::<std::result::Result<Vec<Value>, _>>()
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| data.failed(err))?;
        let script = backup::script(&table, &ddl, &rows, self.dialect);

        let stem = file_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("repo_{}", table));
        let path = backup::write_unique(&self.resources_dir, &stem, Local::now(), &script).await?;
        log::info!(
            target: "runrs::repo",
            "Backed up {} rows of {} to {}",
            rows.len(),
            table,
            path.display()
        );
        Ok(path)
    }
}

/// Shared connection pool the server leases per-request repositories from.
#[derive(Clone)]
pub struct RepositoryPool {
    pool: AnyPool,
    dialect: Dialect,
    resource: String,
}

impl RepositoryPool {
    pub async fn connect(spec: &str, max_connections: u32) -> Result<Self> {
        let spec = ConnectionSpec::parse(spec)?;
        sqlx::any::install_default_drivers();

        let utf8 = spec.dialect.utf8_statement();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .after_connect(move |conn, _meta| {
                Box::pin(async move { conn.execute(utf8).await.map(drop) })
            })
            .connect(spec.url())
            .await
            .map_err(|err| unavailable(&spec.resource, err))?;
        log::info!(
            target: "runrs::repo",
            "Pool for {} ready ({} connections max)",
            spec.resource,
            max_connections
        );

        Ok(Self {
            pool,
            dialect: spec.dialect,
            resource: spec.resource,
        })
    }

    /// Repository over a connection leased from the pool.
    pub async fn lease(&self) -> Result<SqlRepository> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|err| unavailable(&self.resource, err))?;
        Ok(SqlRepository::over(Lease::new(Link::Pooled(conn)), self.dialect))
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

impl fmt::Debug for RepositoryPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryPool")
            .field("dialect", &self.dialect)
            .field("resource", &self.resource)
            .field("size", &self.pool.size())
            .finish()
    }
}
