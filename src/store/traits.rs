use crate::error::Result;
use crate::model::QueryOptions;
use crate::store::Statement;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Driver-agnostic CRUD, query and transaction surface of a repository.
///
/// Every operation except `query` works on the configured source table and
/// fails with `NoSourceTable` when none is set.
#[async_trait::async_trait]
pub trait Repository: Send {
    /// Type rows are mapped onto by `find`.
    type Item: Send;

    /// Inserts the item's fields and returns the generated id, if the driver reports one.
    async fn add<I>(&mut self, item: &I) -> Result<Option<i64>>
    where
        I: Serialize + Sync + ?Sized;

    async fn find(&mut self, options: &QueryOptions) -> Result<Vec<Self::Item>>;

    /// Updates the matching rows with the item's fields; returns the affected row count.
    async fn modify<I>(&mut self, item: &I, options: &QueryOptions) -> Result<u64>
    where
        I: Serialize + Sync + ?Sized;

    async fn remove(&mut self, options: &QueryOptions) -> Result<u64>;

    /// Runs raw SQL, binding `data` positionally when given.
    async fn query(&mut self, sql: &str, data: Option<&[Value]>) -> Result<Statement>;

    async fn begin_transaction(&mut self) -> Result<()>;
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;

    /// Dumps the source table as a SQL script in the resources directory.
    async fn backup(&mut self, file_name: Option<&str>) -> Result<PathBuf>;
}
